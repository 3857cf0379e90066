/// Logical folder an uploaded file is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFolder {
    Covers,
    Videos,
    MediaImages,
    MediaVideos,
    SpeakerPhotos,
    InlineMedia,
}

impl UploadFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadFolder::Covers => "covers",
            UploadFolder::Videos => "videos",
            UploadFolder::MediaImages => "media-images",
            UploadFolder::MediaVideos => "media-videos",
            UploadFolder::SpeakerPhotos => "speaker-photos",
            UploadFolder::InlineMedia => "inline-media",
        }
    }
}

/// A file received in a multipart request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Files accompanying an event draft. `media_files` and `speaker_photos`
/// are positional: entry N belongs to the Nth media descriptor or speaker.
#[derive(Debug, Clone, Default)]
pub struct EventAttachments {
    pub cover_image: Option<Upload>,
    pub vibe_video: Option<Upload>,
    pub media_files: Vec<Option<Upload>>,
    pub speaker_photos: Vec<Option<Upload>>,
    pub inline_media: Vec<Upload>,
}
