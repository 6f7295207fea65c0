use serde::{Deserialize, Serialize};

/// The renderable body of a node: an ordered list of typed blocks.
///
/// Content is validated once, when a node is authored. Nothing in the unlock
/// engine reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeContent {
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

/// One block of node content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Markdown prose.
    Text { body: String },
    /// A multiple choice question.
    Quiz {
        question: String,
        options: Vec<String>,
        answer_index: usize,
        #[serde(default)]
        explanation: Option<String>,
    },
    /// An embedded simulator, referenced by id.
    Simulation {
        simulator_id: String,
        #[serde(default)]
        instructions: Option<String>,
    },
    /// A free-form task submitted by the learner.
    Assignment {
        prompt: String,
        #[serde(default)]
        rubric: Option<String>,
    },
    Image {
        url: String,
        #[serde(default)]
        alt: Option<String>,
    },
    Divider,
}

impl NodeContent {
    /// Check every block, returning a description of the first invalid one.
    pub fn validate(&self) -> Result<(), String> {
        for (i, block) in self.blocks.iter().enumerate() {
            block
                .validate()
                .map_err(|msg| format!("block {}: {}", i, msg))?;
        }
        Ok(())
    }
}

impl ContentBlock {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Text { body } if body.trim().is_empty() => Err("text body is empty".into()),
            Self::Quiz { options, .. } if options.len() < 2 => {
                Err("quiz needs at least two options".into())
            }
            Self::Quiz {
                options,
                answer_index,
                ..
            } if *answer_index >= options.len() => Err(format!(
                "quiz answer_index {} is out of range for {} options",
                answer_index,
                options.len()
            )),
            Self::Quiz { question, .. } if question.trim().is_empty() => {
                Err("quiz question is empty".into())
            }
            Self::Simulation { simulator_id, .. } if simulator_id.trim().is_empty() => {
                Err("simulation has no simulator_id".into())
            }
            Self::Assignment { prompt, .. } if prompt.trim().is_empty() => {
                Err("assignment prompt is empty".into())
            }
            Self::Image { url, .. } if url.trim().is_empty() => Err("image url is empty".into()),
            _ => Ok(()),
        }
    }
}
