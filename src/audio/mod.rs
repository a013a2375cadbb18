use std::path::Path;

/// Prefix every uploaded recording must live under
pub const AUDIO_PREFIX: &str = "audio/";

/// Accepted audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    M4a,
    Flac,
    Ogg,
    Aac,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Aac => "aac",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "m4a" => Some(AudioFormat::M4a),
            "flac" => Some(AudioFormat::Flac),
            "ogg" => Some(AudioFormat::Ogg),
            "aac" => Some(AudioFormat::Aac),
            _ => None,
        }
    }

    /// Format of an object key or file name, judged by its extension
    pub fn from_key(key: &str) -> Option<Self> {
        Path::new(key)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Check that an uploaded object is an audio file in the `audio/` folder
pub fn validate_audio_key(key: &str) -> bool {
    if !key.starts_with(AUDIO_PREFIX) {
        tracing::warn!("Invalid file location: {}", key);
        return false;
    }

    match AudioFormat::from_key(key) {
        Some(_) => true,
        None => {
            let extension = Path::new(key)
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            tracing::warn!("Invalid file type: .{}", extension);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_keys_outside_audio_prefix() {
        for key in [
            "call.mp3",
            "uploads/call.mp3",
            "Audio/call.mp3",
            "transcripts/audio/call.mp3",
            "",
            "audio",
        ] {
            assert!(!validate_audio_key(key), "{key} should be rejected");
        }
    }

    #[test]
    fn test_accepts_allowed_extensions_in_any_case() {
        for key in [
            "audio/call.mp3",
            "audio/call.WAV",
            "audio/nested/dir/call.m4a",
            "audio/call.Flac",
            "audio/call.ogg",
            "audio/call.AAC",
        ] {
            assert!(validate_audio_key(key), "{key} should be accepted");
        }
    }

    #[test]
    fn test_rejects_other_extensions() {
        for key in [
            "audio/call.xyz",
            "audio/call.mp4",
            "audio/call",
            "audio/call.mp3.txt",
            "audio/",
        ] {
            assert!(!validate_audio_key(key), "{key} should be rejected");
        }
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(AudioFormat::from_key("audio/a.M4A"), Some(AudioFormat::M4a));
        assert_eq!(AudioFormat::Aac.as_str(), "aac");
    }
}
