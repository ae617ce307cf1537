use serde::Deserialize;

use crate::error::{Result, VoxoverError};

/// Properties of a media file as reported by ffprobe
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_video: bool,
    pub has_audio: bool,
    pub format_name: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output
pub fn parse_probe_output(json: &str) -> Result<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| VoxoverError::Media(format!("Unreadable probe output: {}", e)))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    // Container duration first; some containers only report it per stream.
    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| s.duration.as_deref()?.parse::<f64>().ok())
                .reduce(f64::max)
        })
        .ok_or_else(|| VoxoverError::Media("Probe output has no duration".to_string()))?;

    Ok(MediaInfo {
        duration,
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        has_video: video.is_some(),
        has_audio,
        format_name: probe
            .format
            .and_then(|f| f.format_name)
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_with_audio() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080, "duration": "30.000000"},
                {"index": 1, "codec_type": "audio", "codec_name": "aac", "duration": "29.980000"}
            ],
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "30.000000"}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration, 30.0);
        assert_eq!(info.width, Some(1920));
        assert_eq!(info.height, Some(1080));
        assert!(info.has_video);
        assert!(info.has_audio);
        assert_eq!(info.format_name, "mov,mp4,m4a,3gp,3g2,mj2");
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 360, "duration": "12.5"}],
            "format": {"format_name": "matroska,webm"}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration, 12.5);
        assert!(!info.has_audio);
    }

    #[test]
    fn test_audio_only_and_missing_duration() {
        let audio = r#"{"streams": [{"codec_type": "audio"}], "format": {"format_name": "mp3", "duration": "4.2"}}"#;
        let info = parse_probe_output(audio).unwrap();
        assert!(!info.has_video);
        assert_eq!(info.width, None);

        assert!(parse_probe_output(r#"{"streams": [], "format": {}}"#).is_err());
        assert!(matches!(parse_probe_output("not json"), Err(VoxoverError::Media(_))));
    }
}
