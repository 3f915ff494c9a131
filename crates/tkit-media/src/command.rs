//! FFmpeg command builder for piped raw-frame encoding.

use crate::recorder::StreamSpec;

/// Builder for an FFmpeg invocation that reads frames from stdin and writes
/// the encoded container to stdout.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Input location
    input: String,
    /// Output location
    output: String,
}

impl FfmpegCommand {
    /// Start a command reading `pipe:0` and writing `pipe:1`.
    pub fn piped() -> Self {
        Self {
            input_args: Vec::new(),
            output_args: Vec::new(),
            input: "pipe:0".to_string(),
            output: "pipe:1".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Describe the raw RGBA frames written to stdin.
    pub fn raw_rgba_input(self, spec: &StreamSpec) -> Self {
        self.input_arg("-f")
            .input_arg("rawvideo")
            .input_arg("-pix_fmt")
            .input_arg("rgba")
            .input_arg("-s")
            .input_arg(format!("{}x{}", spec.width, spec.height))
            .input_arg("-framerate")
            .input_arg(spec.frame_rate.to_string())
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set video bitrate.
    pub fn video_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:v").output_arg(bitrate)
    }

    /// Output pixel format.
    pub fn pixel_format(self, pix_fmt: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(pix_fmt)
    }

    /// Drop audio.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Output container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ];

        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.clone());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.clone());

        args
    }
}

/// Pad odd dimensions up to even ones; 4:2:0 chroma needs even sizes.
pub const EVEN_DIMENSIONS_FILTER: &str = "pad=ceil(iw/2)*2:ceil(ih/2)*2";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piped_webm_command() {
        let spec = StreamSpec {
            width: 641,
            height: 480,
            frame_rate: 30,
        };

        let args = FfmpegCommand::piped()
            .raw_rgba_input(&spec)
            .video_filter(EVEN_DIMENSIONS_FILTER)
            .video_codec("libvpx")
            .video_bitrate("1M")
            .pixel_format("yuv420p")
            .no_audio()
            .format("webm")
            .build_args();

        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        let size_pos = args.iter().position(|a| a == "641x480").unwrap();
        let codec_pos = args.iter().position(|a| a == "libvpx").unwrap();

        assert!(size_pos < input_pos, "frame geometry must precede -i");
        assert!(codec_pos > input_pos);
        assert_eq!(args[input_pos + 1], "pipe:0");
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
        assert!(args.contains(&"-an".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-framerate" && w[1] == "30"));
    }

    #[test]
    fn test_quiet_log_with_progress_on_stderr() {
        let args = FfmpegCommand::piped().build_args();
        assert!(args.windows(2).any(|w| w[0] == "-v" && w[1] == "error"));
        assert!(args.windows(2).any(|w| w[0] == "-progress" && w[1] == "pipe:2"));
    }
}
