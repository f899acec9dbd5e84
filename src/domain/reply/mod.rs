//! Reply - turns the current state and facts into reply text.
//!
//! - `ReplyGenerator` - template selection and rendering
//! - `Formula` - declarative calculations attached to states
//! - `enhance_text` - message-format fragments written to `rep_ext`
//! - `Humanizer` - contextual prefixes and suffixes

mod enhancer;
mod error;
mod formula;
mod generator;
mod humanizer;
mod template;

pub use enhancer::{enhance_text, REPLY_EXTENSIONS};
pub use error::ReplyError;
pub use formula::{Condition, Formula, Operand, Operation, Step, OUTCOME};
pub use generator::{RenderedReply, ReplyGenerator, TemplateChoice, CALC_EXTENSIONS};
pub use humanizer::Humanizer;
pub use template::interpolate;
