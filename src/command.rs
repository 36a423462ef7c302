use std::path::Path;

use crate::region::{WatermarkPosition, WatermarkRegion};

/// Width the replacement logo is scaled to before compositing, preserving
/// aspect ratio.
const LOGO_WIDTH: u32 = 120;

/// Fully assembled ffmpeg argument vector for one rebranding job. Pure
/// data; nothing here touches the filesystem or spawns anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegInvocation {
    pub args: Vec<String>,
}

impl FfmpegInvocation {
    /// Build the delogo (and optional overlay) invocation.
    ///
    /// With a logo the filter graph blurs `region` out of the source,
    /// scales the logo to a fixed width, and composites it at the corner
    /// expression matching `position`. Audio is mapped optionally and
    /// stream-copied, so silent inputs are fine. Without a logo only the
    /// delogo stage runs. Both variants share the encoder settings:
    /// constant quality x264 at a moderate preset with faststart layout,
    /// and both overwrite the destination.
    pub fn build(
        input: &Path,
        output: &Path,
        region: WatermarkRegion,
        position: WatermarkPosition,
        logo: Option<&Path>,
    ) -> Self {
        let delogo = format!(
            "delogo=x={}:y={}:w={}:h={}:show=0",
            region.x, region.y, region.w, region.h
        );

        let mut args: Vec<String> = vec!["-y".into(), "-i".into(), path_arg(input)];

        match logo {
            Some(logo_path) => {
                let filter_complex = format!(
                    "[0:v]{delogo}[delogoed];\
                     [1:v]scale={LOGO_WIDTH}:-1[logo];\
                     [delogoed][logo]overlay={}:format=auto[out]",
                    position.overlay_expr()
                );
                args.extend([
                    "-i".into(),
                    path_arg(logo_path),
                    "-filter_complex".into(),
                    filter_complex,
                    "-map".into(),
                    "[out]".into(),
                    "-map".into(),
                    "0:a?".into(),
                ]);
            }
            None => {
                args.extend(["-vf".into(), delogo]);
            }
        }

        args.extend([
            "-c:v".into(),
            "libx264".into(),
            "-crf".into(),
            "18".into(),
            "-preset".into(),
            "fast".into(),
            "-c:a".into(),
            "copy".into(),
            "-movflags".into(),
            "+faststart".into(),
            path_arg(output),
        ]);

        Self { args }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
