//! Navigation metrics and spoken guidance
//!
//! [`plan`] turns camera and target positions into [`NavigationMetrics`].
//! [`NavigationPlanner`] words them for the user, with a fixed template when
//! the language model is unavailable.

use std::sync::Arc;

use serde::Serialize;

use crate::geometry::{Orientation, Position3D, bearing_to, distance, horizontal_distance, normalize_angle};
use crate::llm::{ChatModel, ChatRequest};

/// Steps per meter of horizontal distance
const STEPS_PER_METER: f64 = 1.5;

/// Height differences below this many meters count as the same level
const SAME_LEVEL_TOLERANCE: f64 = 0.05;

/// Coarse direction of the target relative to where the user faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Left,
    Right,
    Behind,
}

impl Direction {
    /// Classify a relative angle in (−180, 180]
    ///
    /// Forward below 45° either way, behind beyond 135°, otherwise right for
    /// positive angles and left for negative ones. Both bounds are strict, so
    /// exactly 45° is a side and exactly 135° is still a side.
    #[must_use]
    pub fn from_relative_angle(angle: f64) -> Self {
        let magnitude = angle.abs();
        if magnitude < 45.0 {
            Self::Forward
        } else if magnitude > 135.0 {
            Self::Behind
        } else if angle > 0.0 {
            Self::Right
        } else {
            Self::Left
        }
    }

    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Behind => "behind",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vertical placement of the target relative to the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightQualifier {
    Higher,
    Lower,
    SameLevel,
}

impl HeightQualifier {
    /// Classify a height difference in meters (positive = target above)
    #[must_use]
    pub fn from_height_diff(height_diff: f64) -> Self {
        if height_diff.abs() < SAME_LEVEL_TOLERANCE || height_diff.is_nan() {
            Self::SameLevel
        } else if height_diff > 0.0 {
            Self::Higher
        } else {
            Self::Lower
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Higher => "higher",
            Self::Lower => "lower",
            Self::SameLevel => "same level",
        }
    }
}

/// Geometry from the camera to the target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NavigationMetrics {
    /// Straight-line distance in meters
    pub distance: f64,
    /// Distance on the floor plane in meters
    pub horizontal_distance: f64,
    /// Target height minus camera height
    pub vertical_distance: f64,
    /// Turn needed from the current facing, in (−180, 180]
    pub relative_angle: f64,
    /// Coarse direction derived from `relative_angle`
    pub direction: Direction,
    /// Same value as `vertical_distance`
    pub height_diff: f64,
}

/// Compute navigation metrics from the camera pose to a target
#[must_use]
pub fn plan(
    current_pos: &Position3D,
    current_orientation: &Orientation,
    target_pos: &Position3D,
) -> NavigationMetrics {
    let relative_angle =
        normalize_angle(bearing_to(current_pos, target_pos) - current_orientation.yaw);
    let vertical_distance = target_pos.y - current_pos.y;
    let vertical_distance = if vertical_distance.is_finite() {
        vertical_distance
    } else {
        0.0
    };

    NavigationMetrics {
        distance: distance(current_pos, target_pos),
        horizontal_distance: horizontal_distance(current_pos, target_pos),
        vertical_distance,
        relative_angle,
        direction: Direction::from_relative_angle(relative_angle),
        height_diff: vertical_distance,
    }
}

/// Deterministic summary handed to the language model
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationBrief {
    pub target: String,
    pub horizontal_distance: f64,
    pub steps: u32,
    pub direction: Direction,
    pub degrees: u32,
    pub height_diff: f64,
    pub height: HeightQualifier,
}

impl NavigationBrief {
    /// Summarize metrics for `target`
    #[must_use]
    pub fn new(target: &str, metrics: &NavigationMetrics) -> Self {
        Self {
            target: target.to_string(),
            horizontal_distance: metrics.horizontal_distance,
            steps: round_to_u32(metrics.horizontal_distance * STEPS_PER_METER),
            direction: metrics.direction,
            degrees: round_to_u32(metrics.relative_angle.abs()),
            height_diff: metrics.height_diff,
            height: HeightQualifier::from_height_diff(metrics.height_diff),
        }
    }

    /// User prompt asking the model to word the brief
    #[must_use]
    pub fn render_prompt(&self) -> String {
        format!(
            "Generate SHORT navigation instructions to reach a {}.\n\n\
             Details:\n\
             - Distance: {:.1} meters ({} steps)\n\
             - Turn: {} degrees ({})\n\
             - Height: {:.1}m ({})\n\n\
             Keep it to 2-3 short sentences maximum. Be clear and direct.",
            self.target,
            self.horizontal_distance,
            self.steps,
            self.degrees,
            self.direction,
            self.height_diff,
            self.height.as_str(),
        )
    }

    /// Instructions built without a model
    #[must_use]
    pub fn render_template(&self) -> String {
        let target = &self.target;
        let mut sentences = Vec::with_capacity(3);

        sentences.push(match self.direction {
            Direction::Forward => format!("The {target} is ahead of you."),
            Direction::Left | Direction::Right => {
                format!("Turn {} about {} degrees.", self.direction, self.degrees)
            }
            Direction::Behind => format!("Turn around. The {target} is behind you."),
        });

        sentences.push(match self.steps {
            0 => "It is within reach.".to_string(),
            1 => "Walk forward 1 step.".to_string(),
            n => format!("Walk forward {n} steps."),
        });

        match self.height {
            HeightQualifier::Higher => sentences.push("It is a little higher up.".to_string()),
            HeightQualifier::Lower => sentences.push("It is a little lower down.".to_string()),
            HeightQualifier::SameLevel => {}
        }

        sentences.join(" ")
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_u32(value: f64) -> u32 {
    if value.is_finite() {
        value.round().clamp(0.0, f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Words navigation metrics as short spoken instructions
pub struct NavigationPlanner {
    model: Arc<dyn ChatModel>,
}

impl NavigationPlanner {
    /// Create a planner backed by a text model
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Instructions for reaching `target`
    ///
    /// Falls back to [`NavigationBrief::render_template`] when the model call
    /// fails or returns nothing.
    pub async fn instructions(&self, target: &str, metrics: &NavigationMetrics) -> String {
        let brief = NavigationBrief::new(target, metrics);
        let request = ChatRequest::new(brief.render_prompt())
            .system(NAVIGATION_SYSTEM_PROMPT)
            .temperature(0.2);

        match self.model.complete(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!(object = target, "navigation model returned no text, using template");
                brief.render_template()
            }
            Err(e) => {
                tracing::warn!(object = target, error = %e, "navigation wording failed, using template");
                brief.render_template()
            }
        }
    }
}

const NAVIGATION_SYSTEM_PROMPT: &str = "You are a navigation assistant for visually impaired \
users. Generate VERY SHORT and CLEAR navigation instructions. Maximum 2-3 sentences. Be direct \
and concise.\n\nFormat: [Direction], [Distance], [Height if relevant].\nExample: 'Turn left 15 \
degrees. Walk forward 3 steps. The cup is at waist height.'";

/// One line of step-by-step guidance while the user walks
#[must_use]
pub fn step_guidance(target: &str, steps_remaining: u32, direction: Direction) -> String {
    match steps_remaining {
        0 => format!("You've arrived! The {target} should be right in front of you now."),
        1..=5 => format!("Almost there! Just {steps_remaining} more steps {direction}."),
        n => format!("Keep going {direction}. {n} steps to the {target}. I'm here with you."),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{Error, Result};

    const EPS: f64 = 1e-9;

    #[test]
    fn test_direction_boundaries() {
        assert_eq!(Direction::from_relative_angle(0.0), Direction::Forward);
        assert_eq!(Direction::from_relative_angle(44.9), Direction::Forward);
        assert_eq!(Direction::from_relative_angle(-44.9), Direction::Forward);
        assert_eq!(Direction::from_relative_angle(45.0), Direction::Right);
        assert_eq!(Direction::from_relative_angle(-45.0), Direction::Left);
        assert_eq!(Direction::from_relative_angle(135.0), Direction::Right);
        assert_eq!(Direction::from_relative_angle(-135.0), Direction::Left);
        assert_eq!(Direction::from_relative_angle(135.1), Direction::Behind);
        assert_eq!(Direction::from_relative_angle(180.0), Direction::Behind);
    }

    #[test]
    fn test_straight_ahead_is_forward() {
        let metrics = plan(
            &Position3D::new(0.0, 0.0, 0.0),
            &Orientation::new(0.0, 0.0),
            &Position3D::new(0.0, 0.0, 4.0),
        );

        assert!(metrics.relative_angle.abs() < EPS);
        assert_eq!(metrics.direction, Direction::Forward);
        assert!((metrics.horizontal_distance - 4.0).abs() < EPS);
    }

    #[test]
    fn test_yaw_is_subtracted() {
        let camera = Position3D::new(0.0, 0.0, 0.0);
        let target = Position3D::new(0.0, 0.0, 4.0);

        let facing_east = plan(&camera, &Orientation::new(90.0, 0.0), &target);
        assert!((facing_east.relative_angle + 90.0).abs() < EPS);
        assert_eq!(facing_east.direction, Direction::Left);

        let facing_back = plan(&camera, &Orientation::new(180.0, 0.0), &target);
        assert!((facing_back.relative_angle - 180.0).abs() < EPS);
        assert_eq!(facing_back.direction, Direction::Behind);

        let wrapped = plan(&camera, &Orientation::new(-300.0, 0.0), &target);
        assert!((wrapped.relative_angle + 60.0).abs() < EPS);
        assert_eq!(wrapped.direction, Direction::Left);
    }

    #[test]
    fn test_mock_positions_metrics() {
        let metrics = plan(
            &Position3D::new(0.0, 0.0, 0.0),
            &Orientation::new(0.0, 0.0),
            &Position3D::new(2.0, 0.0, 3.0),
        );

        assert_eq!(metrics.direction, Direction::Forward);
        assert!((metrics.relative_angle - 2.0_f64.atan2(3.0).to_degrees()).abs() < EPS);
        assert!((metrics.distance - 13.0_f64.sqrt()).abs() < EPS);
        assert!(metrics.height_diff.abs() < EPS);

        let brief = NavigationBrief::new("cup", &metrics);
        assert_eq!(brief.steps, 5);
        assert_eq!(brief.degrees, 34);
        assert_eq!(brief.height, HeightQualifier::SameLevel);
    }

    #[test]
    fn test_steps_are_rounded() {
        let metrics = |horizontal_distance| NavigationMetrics {
            distance: horizontal_distance,
            horizontal_distance,
            vertical_distance: 0.0,
            relative_angle: 0.0,
            direction: Direction::Forward,
            height_diff: 0.0,
        };

        assert_eq!(NavigationBrief::new("cup", &metrics(1.0)).steps, 2);
        assert_eq!(NavigationBrief::new("cup", &metrics(0.2)).steps, 0);
        assert_eq!(NavigationBrief::new("cup", &metrics(3.0)).steps, 5);
    }

    #[test]
    fn test_height_qualifier() {
        assert_eq!(HeightQualifier::from_height_diff(0.04), HeightQualifier::SameLevel);
        assert_eq!(HeightQualifier::from_height_diff(-0.049), HeightQualifier::SameLevel);
        assert_eq!(HeightQualifier::from_height_diff(0.3), HeightQualifier::Higher);
        assert_eq!(HeightQualifier::from_height_diff(-0.8), HeightQualifier::Lower);
    }

    #[test]
    fn test_prompt_carries_brief() {
        let metrics = plan(
            &Position3D::new(0.0, 1.0, 0.0),
            &Orientation::new(0.0, 0.0),
            &Position3D::new(-2.0, 1.5, 0.0),
        );
        let prompt = NavigationBrief::new("mug", &metrics).render_prompt();

        assert!(prompt.contains("reach a mug"));
        assert!(prompt.contains("2.0 meters (3 steps)"));
        assert!(prompt.contains("90 degrees (left)"));
        assert!(prompt.contains("0.5m (higher)"));
    }

    #[test]
    fn test_template_wording() {
        let brief = NavigationBrief {
            target: "cup".to_string(),
            horizontal_distance: 2.0,
            steps: 3,
            direction: Direction::Right,
            degrees: 60,
            height_diff: -0.4,
            height: HeightQualifier::Lower,
        };
        assert_eq!(
            brief.render_template(),
            "Turn right about 60 degrees. Walk forward 3 steps. It is a little lower down."
        );
    }

    #[test]
    fn test_step_guidance() {
        assert_eq!(
            step_guidance("cup", 8, Direction::Forward),
            "Keep going forward. 8 steps to the cup. I'm here with you."
        );
        assert_eq!(
            step_guidance("cup", 5, Direction::Left),
            "Almost there! Just 5 more steps left."
        );
        assert_eq!(
            step_guidance("cup", 1, Direction::Forward),
            "Almost there! Just 1 more steps forward."
        );
        assert_eq!(
            step_guidance("cup", 0, Direction::Forward),
            "You've arrived! The cup should be right in front of you now."
        );
    }

    struct RecordingModel {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
            self.prompts.lock().unwrap().push(request.user);
            self.reply
                .clone()
                .ok_or_else(|| Error::Model("unavailable".to_string()))
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    fn cup_metrics() -> NavigationMetrics {
        plan(
            &Position3D::new(0.0, 0.0, 0.0),
            &Orientation::new(0.0, 0.0),
            &Position3D::new(2.0, 0.0, 3.0),
        )
    }

    #[tokio::test]
    async fn test_instructions_use_model_wording() {
        let model = Arc::new(RecordingModel {
            reply: Some("  Walk forward 5 steps. The cup is ahead.  ".to_string()),
            prompts: Mutex::new(Vec::new()),
        });
        let planner = NavigationPlanner::new(model.clone());

        let text = planner.instructions("cup", &cup_metrics()).await;

        assert_eq!(text, "Walk forward 5 steps. The cup is ahead.");
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("(5 steps)"));
    }

    #[tokio::test]
    async fn test_instructions_fall_back_to_template() {
        let failing = NavigationPlanner::new(Arc::new(RecordingModel {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }));
        let blank = NavigationPlanner::new(Arc::new(RecordingModel {
            reply: Some("   ".to_string()),
            prompts: Mutex::new(Vec::new()),
        }));

        let expected = "The cup is ahead of you. Walk forward 5 steps.";
        assert_eq!(failing.instructions("cup", &cup_metrics()).await, expected);
        assert_eq!(blank.instructions("cup", &cup_metrics()).await, expected);
    }
}
