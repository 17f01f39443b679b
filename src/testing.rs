//! Scripted model double for exercising the pipelines without network access.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, Rgb, RgbImage};

use crate::model::types::{Candidate, Content, GenerateRequest, GenerateResponse, InlineData, ModelInfo, Part};
use crate::model::{ModelApi, ModelError};

/// Answers `generate_content` calls from a queue, in order.
/// An exhausted queue answers with a network error.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<GenerateResponse>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    models: Vec<ModelInfo>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<GenerateResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Text parts of every request received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn single_part(part: Part) -> GenerateResponse {
        GenerateResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![part],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            prompt_feedback: None,
        }
    }

    pub fn text_response(text: &str) -> GenerateResponse {
        Self::single_part(Part::text(text))
    }

    /// A gradient PNG of the given size as inline data.
    pub fn image_response(width: u32, height: u32) -> GenerateResponse {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
        });
        let mut bytes = Vec::new();
        // writing to memory only fails on encoder bugs
        if let Err(e) = img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png) {
            log::error!("Failed to encode scripted image: {}", e);
        }
        Self::single_part(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/png".to_string(),
                data: BASE64.encode(&bytes),
            }),
        })
    }
}

impl ModelApi for ScriptedModel {
    fn generate_content(&self, _model: &str, request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text: String = request
            .contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(text);
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .ok_or_else(|| ModelError::Network("no scripted response left".to_string()))
    }

    fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        Ok(self.models.clone())
    }
}
