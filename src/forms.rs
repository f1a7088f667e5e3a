//! Admin form state.
//!
//! Forms hold exactly what the editor shows: every field as text (tags as one
//! comma-separated string, dates as RFC 3339). They convert to and from the
//! stored records and are rebuilt from multipart submissions.

use axum::extract::{Multipart, multipart::MultipartError};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    models::{
        BlogPost, BlogPostInput, Documentary, DocumentaryInput, HomepageContent,
        HomepageContentInput, Podcast, PodcastInput,
    },
    mutations::ImageUpload,
};

pub const HERO_SECTION_ID: &str = "hero";

/// Splits the tag field on commas, trimming each tag and dropping empties.
/// Order is kept. A tag that itself contains a comma cannot be represented.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// --- Submitted fields ---

/// FormFields
///
/// Text fields of a submission. Missing fields read as empty.
#[derive(Debug, Clone, Default)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or_default()
    }

    /// Checkbox semantics: "on", "true", "1" and "yes" are checked.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), "on" | "true" | "1" | "yes")
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FormFields::default();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// Why a submission could not be taken as a whole.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Image is larger than the {} MB upload limit", .0 / (1024 * 1024))]
    ImageTooLarge(usize),
    #[error("The form could not be read: {}", .0.body_text())]
    Unreadable(#[from] MultipartError),
}

/// RejectedSubmission
///
/// A submission that failed to decode, with every text field read up to that
/// point so the form can be shown again.
#[derive(Debug)]
pub struct RejectedSubmission {
    pub fields: FormFields,
    pub reason: SubmissionError,
}

/// Submission
///
/// A decoded `multipart/form-data` body: text fields plus the optional `image`
/// file. A file input left empty is treated as no file.
#[derive(Debug, Default)]
pub struct Submission {
    pub fields: FormFields,
    pub image: Option<ImageUpload>,
}

impl Submission {
    /// Reads the whole body. An image over `max_image_bytes` is skipped, the
    /// remaining fields are still read, and the submission is rejected.
    pub async fn read(
        mut multipart: Multipart,
        max_image_bytes: usize,
    ) -> Result<Self, RejectedSubmission> {
        let mut submission = Submission::default();
        match read_parts(&mut multipart, &mut submission, max_image_bytes).await {
            Ok(()) => Ok(submission),
            Err(reason) => Err(RejectedSubmission {
                fields: submission.fields,
                reason,
            }),
        }
    }
}

async fn read_parts(
    multipart: &mut Multipart,
    submission: &mut Submission,
    max_image_bytes: usize,
) -> Result<(), SubmissionError> {
    let mut oversized = false;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name != "image" {
            let value = field.text().await?;
            submission.fields.insert(name, value);
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if bytes.len() + chunk.len() > max_image_bytes {
                oversized = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        if !oversized && !bytes.is_empty() {
            submission.image = Some(ImageUpload {
                file_name,
                content_type,
                bytes,
            });
        }
    }

    if oversized {
        return Err(SubmissionError::ImageTooLarge(max_image_bytes));
    }
    Ok(())
}

// --- Blog ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BlogPostForm {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image_url: String,
    pub category: String,
    pub author: String,
    pub date: String,
}

impl BlogPostForm {
    /// Create defaults: empty fields, publication date now.
    pub fn blank() -> Self {
        Self {
            date: now_rfc3339(),
            ..Self::default()
        }
    }

    pub fn from_record(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            content: post.content.clone(),
            image_url: post.image_url.clone().unwrap_or_default(),
            category: post.category.clone(),
            author: post.author.clone(),
            date: post.date.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn from_fields(fields: &FormFields) -> Self {
        Self {
            title: fields.get("title").to_string(),
            excerpt: fields.get("excerpt").to_string(),
            content: fields.get("content").to_string(),
            image_url: fields.get("image_url").to_string(),
            category: fields.get("category").to_string(),
            author: fields.get("author").to_string(),
            date: fields.get("date").to_string(),
        }
    }

    pub fn to_input(&self) -> BlogPostInput {
        BlogPostInput {
            title: self.title.trim().to_string(),
            excerpt: self.excerpt.trim().to_string(),
            content: self.content.clone(),
            image_url: optional(&self.image_url),
            category: self.category.trim().to_string(),
            author: self.author.trim().to_string(),
            date: self.date.trim().to_string(),
        }
    }
}

// --- Podcasts ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PodcastForm {
    pub title: String,
    pub host: String,
    pub guest: String,
    pub duration: String,
    pub image_url: String,
    pub description: String,
    pub audio_url: String,
    pub date: String,
}

impl PodcastForm {
    pub fn blank() -> Self {
        Self {
            date: now_rfc3339(),
            ..Self::default()
        }
    }

    pub fn from_record(podcast: &Podcast) -> Self {
        Self {
            title: podcast.title.clone(),
            host: podcast.host.clone(),
            guest: podcast.guest.clone().unwrap_or_default(),
            duration: podcast.duration.clone(),
            image_url: podcast.image_url.clone().unwrap_or_default(),
            description: podcast.description.clone(),
            audio_url: podcast.audio_url.clone().unwrap_or_default(),
            date: podcast.date.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn from_fields(fields: &FormFields) -> Self {
        Self {
            title: fields.get("title").to_string(),
            host: fields.get("host").to_string(),
            guest: fields.get("guest").to_string(),
            duration: fields.get("duration").to_string(),
            image_url: fields.get("image_url").to_string(),
            description: fields.get("description").to_string(),
            audio_url: fields.get("audio_url").to_string(),
            date: fields.get("date").to_string(),
        }
    }

    pub fn to_input(&self) -> PodcastInput {
        PodcastInput {
            title: self.title.trim().to_string(),
            host: self.host.trim().to_string(),
            guest: optional(&self.guest),
            duration: self.duration.trim().to_string(),
            image_url: optional(&self.image_url),
            description: self.description.clone(),
            audio_url: optional(&self.audio_url),
            date: self.date.trim().to_string(),
        }
    }
}

// --- Documentaries ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DocumentaryForm {
    pub title: String,
    pub director: String,
    pub duration: String,
    pub release_date: String,
    pub image_url: String,
    pub description: String,
    pub video_url: String,
    /// Comma-separated, e.g. "Activism, Global".
    pub tags: String,
    pub coming_soon: bool,
}

impl DocumentaryForm {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn from_record(doc: &Documentary) -> Self {
        Self {
            title: doc.title.clone(),
            director: doc.director.clone(),
            duration: doc.duration.clone(),
            release_date: doc.release_date.clone(),
            image_url: doc.image_url.clone().unwrap_or_default(),
            description: doc.description.clone(),
            video_url: doc.video_url.clone().unwrap_or_default(),
            tags: join_tags(&doc.tags),
            coming_soon: doc.coming_soon,
        }
    }

    pub fn from_fields(fields: &FormFields) -> Self {
        Self {
            title: fields.get("title").to_string(),
            director: fields.get("director").to_string(),
            duration: fields.get("duration").to_string(),
            release_date: fields.get("release_date").to_string(),
            image_url: fields.get("image_url").to_string(),
            description: fields.get("description").to_string(),
            video_url: fields.get("video_url").to_string(),
            tags: fields.get("tags").to_string(),
            coming_soon: fields.flag("coming_soon"),
        }
    }

    pub fn to_input(&self) -> DocumentaryInput {
        DocumentaryInput {
            title: self.title.trim().to_string(),
            director: self.director.trim().to_string(),
            duration: self.duration.trim().to_string(),
            release_date: self.release_date.trim().to_string(),
            image_url: optional(&self.image_url),
            description: self.description.clone(),
            video_url: optional(&self.video_url),
            tags: split_tags(&self.tags),
            coming_soon: self.coming_soon,
        }
    }
}

// --- Homepage hero ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HeroForm {
    pub title: String,
    pub subtitle: String,
    pub learn_more_url: String,
    pub listen_now_url: String,
    pub image_url: String,
}

impl Default for HeroForm {
    /// The copy shown until an admin saves the section for the first time.
    fn default() -> Self {
        Self {
            title: "Empowering Women Through Stories".to_string(),
            subtitle: "Join our community where women's voices are amplified through podcasts, \
                       documentaries, and inspiring content."
                .to_string(),
            learn_more_url: "/about".to_string(),
            listen_now_url: "/podcasts".to_string(),
            image_url: "https://images.unsplash.com/photo-1573496359142-b8d87734a5a2\
                        ?auto=format&fit=crop&w=1169&q=80"
                .to_string(),
        }
    }
}

impl HeroForm {
    pub fn from_record(section: &HomepageContent) -> Self {
        Self {
            title: section.title.clone(),
            subtitle: section.subtitle.clone().unwrap_or_default(),
            learn_more_url: section.learn_more_url.clone().unwrap_or_default(),
            listen_now_url: section.listen_now_url.clone().unwrap_or_default(),
            image_url: section.image_url.clone().unwrap_or_default(),
        }
    }

    pub fn from_fields(fields: &FormFields) -> Self {
        Self {
            title: fields.get("title").to_string(),
            subtitle: fields.get("subtitle").to_string(),
            learn_more_url: fields.get("learn_more_url").to_string(),
            listen_now_url: fields.get("listen_now_url").to_string(),
            image_url: fields.get("image_url").to_string(),
        }
    }

    pub fn to_input(&self) -> HomepageContentInput {
        HomepageContentInput {
            id: HERO_SECTION_ID.to_string(),
            section_type: HERO_SECTION_ID.to_string(),
            title: self.title.trim().to_string(),
            subtitle: optional(&self.subtitle),
            learn_more_url: optional(&self.learn_more_url),
            listen_now_url: optional(&self.listen_now_url),
            image_url: optional(&self.image_url),
        }
    }
}
