//! Render prompts built by the orchestrator.
//!
//! Every render call sends the original photo plus one of these prompts.
//! The shared constraints keep the subject's face untouched so that only
//! the hair changes between candidates and between angles.

use crate::stage::ViewLabel;

/// Constraints appended to every render prompt.
const SUBJECT_CONSTRAINTS: &str = "The background must be pure white. Frame from shoulders up. \
     Preserve exact facial features, skin tone, and head shape. Only change the hair.";

/// Prompt for a candidate's front-view preview.
#[must_use]
pub fn front_view(description: &str) -> String {
    format!(
        "Generate a front view of this hairstyle: \"{description}\". \
         Apply it to the person in the image. {SUBJECT_CONSTRAINTS}"
    )
}

/// Fixed framing instruction for one of the remaining angles.
///
/// The front view has no extra framing; it is the reference the other
/// angles are derived from.
#[must_use]
pub const fn framing(label: ViewLabel) -> &'static str {
    match label {
        ViewLabel::Front => "",
        ViewLabel::Back => {
            "This is the back view of the person's head. Show the hairstyle from behind."
        }
        ViewLabel::LeftSide => {
            "This is the person's left profile view. The person should be turned to show \
             the left side of their face, looking towards the right edge of the image."
        }
        ViewLabel::RightSide => {
            "This is the person's right profile view. The person should be turned to show \
             the right side of their face, looking towards the left edge of the image."
        }
    }
}

/// Prompt for one of the remaining angles, derived from the canonical
/// description of the selected front view.
#[must_use]
pub fn remaining_view(label: ViewLabel, canonical_description: &str) -> String {
    let view = label.label().to_lowercase();
    let framing = framing(label);
    let mut prompt = format!(
        "Based on the front view, generate the {view} of this hairstyle: \
         \"{canonical_description}\". Apply it to the person from the original photo. \
         {SUBJECT_CONSTRAINTS}"
    );
    if !framing.is_empty() {
        prompt.push(' ');
        prompt.push_str(framing);
    }
    prompt
}
