//! `generate_workout_plan` tool.
//!
//! Builds a weekly gym/boxing routine from a training goal, experience
//! level and equipment access. The tables are static; no I/O happens here.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_args, Capability};
use crate::error::EngineError;
use crate::protocol::engine::{tool_handler, Engine, ToolDefinition, ToolError, ToolOutput};

pub const TOOL_NAME: &str = "generate_workout_plan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Goal {
    FatLoss,
    MuscleGain,
    BoxingSkill,
    Endurance,
}

impl Goal {
    fn label(self) -> &'static str {
        match self {
            Goal::FatLoss => "Fat loss",
            Goal::MuscleGain => "Muscle gain",
            Goal::BoxingSkill => "Boxing skill",
            Goal::Endurance => "Endurance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyPart {
    Chest,
    Back,
    Legs,
    Shoulders,
    Arms,
    Core,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanArgs {
    goal: Goal,
    days_per_week: u8,
    experience_level: Level,
    has_gym_access: bool,
    #[serde(default)]
    target_body_parts: Option<Vec<BodyPart>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_sec: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Routine {
    pub day: &'static str,
    pub category: &'static str,
    pub exercises: Vec<Exercise>,
}

fn lift(name: &'static str, sets: u8, reps: &'static str, rest_sec: u16) -> Exercise {
    Exercise {
        name,
        sets: Some(sets),
        reps: Some(reps),
        rest_sec: Some(rest_sec),
        ..Default::default()
    }
}

fn rounds(name: &'static str, rounds: u8, duration: &'static str, rest_sec: u16) -> Exercise {
    Exercise {
        name,
        rounds: Some(rounds),
        duration: Some(duration),
        rest_sec: Some(rest_sec),
        ..Default::default()
    }
}

fn cardio(name: &'static str, duration: &'static str) -> Exercise {
    Exercise {
        name,
        duration: Some(duration),
        ..Default::default()
    }
}

fn tip(mut exercise: Exercise, tip: &'static str) -> Exercise {
    exercise.tip = Some(tip);
    exercise
}

fn chest_day(level: Level) -> Routine {
    let main_sets = if level == Level::Beginner { 3 } else { 4 };
    Routine {
        day: "Monday",
        category: "Chest + triceps",
        exercises: vec![
            tip(lift("Barbell bench press", main_sets, "8-10", 90), "Lower slowly, press explosively"),
            tip(lift("Incline dumbbell press", 3, "10-12", 60), "Focus on the upper chest"),
            tip(lift("Cable crossover", 3, "12-15", 45), "Squeeze at full contraction"),
            lift("Triceps dips", 3, "10-12", 60),
        ],
    }
}

fn back_day(level: Level) -> Routine {
    let main_sets = if level == Level::Beginner { 3 } else { 4 };
    Routine {
        day: "Wednesday",
        category: "Back + biceps",
        exercises: vec![
            tip(lift("Deadlift", main_sets, "6-8", 120), "Neutral spine, braced core"),
            lift("Pull-up (or lat pulldown)", 3, "8-10", 90),
            tip(lift("Barbell row", 3, "10-12", 60), "Contract through the lower lats"),
            lift("Barbell curl", 3, "10-12", 45),
        ],
    }
}

fn leg_day() -> Routine {
    Routine {
        day: "Friday",
        category: "Legs",
        exercises: vec![
            tip(lift("Barbell squat", 4, "8-10", 120), "Knees track over toes, 90 degree depth"),
            lift("Leg press", 3, "12-15", 90),
            tip(lift("Leg curl", 3, "12-15", 60), "Focus on the hamstrings"),
            tip(lift("Calf raise", 4, "15-20", 45), "Full calf contraction"),
        ],
    }
}

fn boxing_days() -> Routine {
    Routine {
        day: "Tue/Thu/Sat",
        category: "Boxing technique + conditioning",
        exercises: vec![
            tip(rounds("Warm-up: jump rope", 3, "3 min", 60), "Keep a steady rhythm"),
            tip(rounds("Shadow boxing", 5, "3 min", 60), "Footwork and combinations"),
            tip(rounds("Heavy bag", 6, "3 min", 90), "Power and accuracy together"),
            tip(rounds("Mitt work (partner)", 4, "2 min", 60), "Apply coach feedback"),
            lift("Core circuit", 3, "20 each", 45),
            tip(lift("Burpee", 3, "15", 45), "Explosive"),
        ],
    }
}

fn fat_loss_days() -> Routine {
    Routine {
        day: "Mon/Wed/Fri",
        category: "High-intensity intervals + strength",
        exercises: vec![
            Exercise {
                name: "Jump rope intervals",
                sets: Some(5),
                duration: Some("3 min on / 1 min rest"),
                tip: Some("Drive the heart rate up"),
                ..Default::default()
            },
            tip(lift("Burpee", 4, "20", 45), "Full body"),
            lift("Mountain climber", 3, "30", 30),
            tip(lift("Kettlebell swing", 4, "15", 60), "Hip hinge"),
            lift("Jump squat", 3, "15", 45),
        ],
    }
}

fn endurance_days() -> Routine {
    Routine {
        day: "Tue/Thu/Sun",
        category: "Endurance + cardio",
        exercises: vec![
            Exercise {
                pace: Some("Conversational"),
                tip: Some("Heart rate 120-140"),
                ..cardio("Running", "30-45 min")
            },
            tip(cardio("Cycling", "20 min"), "Intervals: 2 min fast / 1 min easy"),
            tip(cardio("Rowing machine", "15 min"), "Full-body endurance"),
            lift("Bodyweight circuit", 4, "20 each", 30),
        ],
    }
}

/// Routines for a goal. Muscle gain needs gym access; without it the plan is empty.
pub fn routines_for(
    goal: Goal,
    has_gym_access: bool,
    level: Level,
    days_per_week: u8,
    target: Option<&[BodyPart]>,
) -> Vec<Routine> {
    const DEFAULT_SPLIT: [BodyPart; 3] = [BodyPart::Chest, BodyPart::Back, BodyPart::Legs];

    match goal {
        Goal::MuscleGain if has_gym_access => {
            let parts = target.unwrap_or(&DEFAULT_SPLIT);
            let mut routines = Vec::new();
            if parts.contains(&BodyPart::Chest) {
                routines.push(chest_day(level));
            }
            if parts.contains(&BodyPart::Back) {
                routines.push(back_day(level));
            }
            if parts.contains(&BodyPart::Legs) && days_per_week >= 3 {
                routines.push(leg_day());
            }
            routines
        }
        Goal::MuscleGain => Vec::new(),
        Goal::BoxingSkill => vec![boxing_days()],
        Goal::FatLoss => vec![fat_loss_days()],
        Goal::Endurance => vec![endurance_days()],
    }
}

fn cautions(level: Level) -> Vec<String> {
    vec![
        "Joint safety: warm up knees, lower back and shoulders before loading".to_string(),
        "Hydration: drink enough water before and after training".to_string(),
        "Recovery: leave at least 48 hours before training the same muscle group".to_string(),
        format!("Current level: {} - increase weights gradually", level.label()),
    ]
}

fn generate(arguments: Value) -> Result<ToolOutput, ToolError> {
    let args: PlanArgs = parse_args(arguments)?;
    if !(2..=6).contains(&args.days_per_week) {
        return Err(ToolError::InvalidArguments(format!(
            "daysPerWeek must be between 2 and 6, got {}",
            args.days_per_week
        )));
    }

    let routines = routines_for(
        args.goal,
        args.has_gym_access,
        args.experience_level,
        args.days_per_week,
        args.target_body_parts.as_deref(),
    );

    let plan = json!({
        "goal": args.goal.label(),
        "level": args.experience_level.label(),
        "sessionsPerWeek": args.days_per_week,
        "environment": if args.has_gym_access { "Gym" } else { "Home training" },
        "routines": routines,
        "cautions": cautions(args.experience_level),
    });

    serde_json::to_string_pretty(&plan)
        .map(ToolOutput::text)
        .map_err(|e| ToolError::Failed(e.to_string()))
}

pub struct WorkoutPlan;

impl Capability for WorkoutPlan {
    fn name(&self) -> &'static str {
        "workout_plan"
    }

    fn register<'a>(&'a self, engine: &'a mut Engine) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(async move {
            engine.register_tool(
                ToolDefinition {
                    name: TOOL_NAME.to_string(),
                    description: "Generate a gym/boxing workout routine for a goal and environment, \
                                  with sets, reps and rest times per exercise."
                        .to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "goal": {
                                "type": "string",
                                "enum": ["fatLoss", "muscleGain", "boxingSkill", "endurance"]
                            },
                            "daysPerWeek": { "type": "integer", "minimum": 2, "maximum": 6 },
                            "experienceLevel": {
                                "type": "string",
                                "enum": ["beginner", "intermediate", "advanced"]
                            },
                            "hasGymAccess": { "type": "boolean" },
                            "targetBodyParts": {
                                "type": "array",
                                "items": {
                                    "type": "string",
                                    "enum": ["chest", "back", "legs", "shoulders", "arms", "core"]
                                }
                            }
                        },
                        "required": ["goal", "daysPerWeek", "experienceLevel", "hasGymAccess"]
                    }),
                },
                tool_handler(|arguments| async move { generate(arguments) }),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_muscle_gain_split_respects_days() {
        let three_days = routines_for(Goal::MuscleGain, true, Level::Advanced, 3, None);
        assert_eq!(three_days.len(), 3);
        assert_eq!(three_days[0].exercises[0].sets, Some(4));

        let two_days = routines_for(Goal::MuscleGain, true, Level::Beginner, 2, None);
        assert_eq!(two_days.len(), 2);
        assert_eq!(two_days[0].exercises[0].sets, Some(3));
    }

    #[test]
    fn test_muscle_gain_without_gym_is_empty() {
        assert!(routines_for(Goal::MuscleGain, false, Level::Beginner, 4, None).is_empty());
    }

    #[test]
    fn test_target_body_parts_filter() {
        let routines = routines_for(
            Goal::MuscleGain,
            true,
            Level::Intermediate,
            5,
            Some(&[BodyPart::Back]),
        );
        assert_eq!(routines.len(), 1);
        assert_eq!(routines[0].category, "Back + biceps");
    }

    #[test]
    fn test_generate_output() {
        let output = generate(json!({
            "goal": "boxingSkill",
            "daysPerWeek": 3,
            "experienceLevel": "beginner",
            "hasGymAccess": false
        }))
        .unwrap();

        let [crate::protocol::engine::Content::Text { text }] = output.content.as_slice() else {
            panic!("expected a single text block");
        };
        let plan: Value = serde_json::from_str(text).unwrap();
        assert_eq!(plan["goal"], "Boxing skill");
        assert_eq!(plan["environment"], "Home training");
        assert_eq!(plan["routines"][0]["exercises"][0]["rounds"], 3);
        assert_eq!(plan["cautions"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_generate_rejects_bad_arguments() {
        let out_of_range = generate(json!({
            "goal": "fatLoss",
            "daysPerWeek": 7,
            "experienceLevel": "beginner",
            "hasGymAccess": true
        }));
        assert!(matches!(out_of_range, Err(ToolError::InvalidArguments(_))));

        let unknown_goal = generate(json!({
            "goal": "yoga",
            "daysPerWeek": 3,
            "experienceLevel": "beginner",
            "hasGymAccess": true
        }));
        assert!(matches!(unknown_goal, Err(ToolError::InvalidArguments(_))));
    }
}
