//! Exercises the transform path end to end with stub `ffmpeg`/`ffprobe`
//! executables on `PATH`. Lives in its own test binary because it mutates
//! the process environment.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tempfile::TempDir;
use video_rebrander::{AppState, Config, LogoPreset, WatermarkPosition};

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write stub script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("mark stub script executable");
}

#[tokio::test(flavor = "multi_thread")]
async fn single_permit_serializes_transforms() {
    let workspace = TempDir::new().expect("create workspace");
    let bin = TempDir::new().expect("create stub bin dir");
    let run_log = workspace.path().join("runs.log");

    write_script(
        bin.path(),
        "ffprobe",
        concat!(
            "#!/bin/sh\n",
            "printf '%s' '{\"streams\":[{\"codec_type\":\"video\",",
            "\"width\":1280,\"height\":720}]}'\n",
        ),
    );
    // Records start/end timestamps, holds the encode slot briefly, and
    // produces the expected output file (its path is the final argument).
    write_script(
        bin.path(),
        "ffmpeg",
        &format!(
            concat!(
                "#!/bin/sh\n",
                "echo \"start $(date +%s%N)\" >> {log}\n",
                "sleep 0.3\n",
                "for out in \"$@\"; do :; done\n",
                ": > \"$out\"\n",
                "echo \"end $(date +%s%N)\" >> {log}\n",
            ),
            log = run_log.display()
        ),
    );

    let old_path = std::env::var("PATH").unwrap_or_default();
    unsafe {
        std::env::set_var("PATH", format!("{}:{old_path}", bin.path().display()));
    }

    let config = Config {
        workspace: workspace.path().to_string_lossy().into_owned(),
        max_concurrent_jobs: 1,
        ..Config::default()
    };
    let state = AppState::new(&config).await.expect("create app state");

    let mut handles = Vec::new();
    for job in ["job-a", "job-b"] {
        let state = state.clone();
        let input = state.uploads_dir().join(format!("{job}.mp4"));
        let output = state.outputs_dir().join(format!("{job}_processed.mp4"));
        std::fs::write(&input, b"fake video").expect("stage input");

        handles.push(tokio::spawn(async move {
            video_rebrander::job::run_transform(
                &state,
                job,
                &input,
                &output,
                LogoPreset::None,
                WatermarkPosition::BottomRight,
            )
            .await
            .expect("transform succeeds");
            assert!(output.exists());
        }));
    }
    for handle in handles {
        handle.await.expect("join transform task");
    }

    let log = std::fs::read_to_string(&run_log).expect("read run log");
    let mut events: Vec<(String, u128)> = log
        .lines()
        .map(|line| {
            let (label, nanos) = line.split_once(' ').expect("log line shape");
            (label.to_string(), nanos.parse().expect("nanosecond stamp"))
        })
        .collect();
    events.sort_by_key(|(_, nanos)| *nanos);

    let labels: Vec<&str> = events.iter().map(|(label, _)| label.as_str()).collect();
    // With one permit the second encode must not start before the first
    // ends; any overlap would interleave the starts.
    assert_eq!(labels, ["start", "end", "start", "end"]);
}
