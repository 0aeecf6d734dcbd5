//! Prompt templates, rendered with minijinja.

use minijinja::Environment;
use serde::Serialize;

use crate::error::CapabilityError;

pub(crate) const STORY: &str = r#"Create a magical children's story for a {{ age }}-year-old based on this input:

Child's words: "{{ input_text }}"
{% if favorite_characters %}
Include these favorite characters: {{ favorite_characters | join(", ") }}
{%- endif %}
{%- if educational_focus %}
Subtly teach about: {{ educational_focus | join(", ") }}
{%- endif %}
{%- if include_elements %}
Include these elements: {{ include_elements | join(", ") }}
{%- endif %}
{%- if emotion_note %}
{{ emotion_note }}
{%- endif %}

Guidelines:
- Create exactly {{ scene_count }} short scenes
- Each scene should be 2-3 sentences max
- Use simple, age-appropriate language for a {{ age }}-year-old
- Include a gentle lesson or positive message
- Start each scene with "Scene X:" where X is the scene number
- Give the story a creative title on the first line
- Keep it positive and child-friendly

Format:
Title: [Creative Story Title]
{% for n in range(1, scene_count + 1) %}
Scene {{ n }}: [Scene text - 2-3 sentences]
{%- endfor %}
"#;

pub(crate) const EMOTION: &str = r#"Analyze the emotional content of this child's statement.
Be sensitive to subtle emotional cues.

Statement: "{{ text }}"

Score each emotion from 0 to 1:
- happiness: joy, excitement, contentment, fun, play
- sadness: disappointment, loneliness, grief, missing someone
- fear: worry, anxiety, scared, nervous
- anger: frustration, annoyance, mad, upset
- surprise: amazement, confusion, wonder
- neutral: calm, balanced, matter-of-fact

Respond with a single JSON object with exactly these keys:
{"happiness": 0.0, "sadness": 0.0, "fear": 0.0, "anger": 0.0, "surprise": 0.0, "neutral": 0.0}
"#;

pub(crate) const SCENE_IMAGE: &str = r#"Create a detailed image generation prompt for this children's story scene.

Guidelines:
- Child-friendly, whimsical illustration style
- Bright, warm, inviting colors
- Safe, positive atmosphere
- Describe characters, expressions and the setting
- Watercolor or digital painting style, suitable for ages 3-8

Answer with one paragraph starting with "Children's book illustration:".

Scene:
{{ scene_text }}
"#;

pub(crate) const CHARACTER: &str = r#"Create a character design for a {{ character }} in a children's story.

Target age: {{ age }} years old
Favorite colors: {{ colors | join(", ") }}

Design a friendly, approachable character. Describe appearance and clothing,
a happy and kind facial expression, a color scheme using the favorite colors,
and any magical features. Style: soft, warm cartoon illustration.

Character:
{{ character }}
"#;

pub(crate) fn render<S: Serialize>(template: &str, context: S) -> Result<String, CapabilityError> {
  let env = Environment::new();
  Ok(env.render_str(template, context)?)
}
