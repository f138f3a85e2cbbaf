//! Locally composed assistant message. No upstream involved.

use crate::model::{AssistantMessage, NextEvent, TaskItem, WeatherReading};

/// Greeting for a local hour of day.
pub fn greeting(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning",
        12..=17 => "Good afternoon",
        18..=22 => "Good evening",
        _ => "Hello, night owl",
    }
}

/// Builds the assistant line from what the other sources produced.
pub fn compose(
    hour: u32,
    weather: &WeatherReading,
    next_event: Option<&NextEvent>,
    tasks: &[TaskItem],
) -> AssistantMessage {
    let mut parts = Vec::new();

    if let Some(t) = weather.temperature {
        parts.push(format!("It is {:.0}° and {} in {}.", t, weather.condition.to_lowercase(), weather.location));
    }

    match next_event {
        Some(e) if e.minutes_until <= 60 => {
            parts.push(format!("{} starts in {} min.", e.title, e.minutes_until))
        }
        Some(e) => parts.push(format!("Next up: {}.", e.title)),
        None => parts.push("Nothing else on the calendar today.".to_string()),
    }

    let urgent = tasks.iter().filter(|t| t.urgent).count();
    match (tasks.len(), urgent) {
        (0, _) => parts.push("Your task list is clear.".to_string()),
        (n, 0) => parts.push(format!("{} open tasks.", n)),
        (n, u) => parts.push(format!("{} open tasks, {} urgent.", n, u)),
    }

    AssistantMessage {
        greeting: greeting(hour).to_string(),
        message: parts.join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_mentions_urgent_and_next_event() {
        let weather = WeatherReading::unavailable("Athens");
        let next = NextEvent {
            title: "Standup".into(),
            time: "2026-10-18T10:00:00Z".into(),
            minutes_until: 15,
            location: None,
        };
        let tasks = vec![TaskItem {
            id: "1".into(),
            content: "x".into(),
            priority: 4,
            due: None,
            urgent: true,
        }];
        let msg = compose(8, &weather, Some(&next), &tasks);
        assert_eq!(msg.greeting, "Good morning");
        assert_eq!(msg.message, "Standup starts in 15 min. 1 open tasks, 1 urgent.");
    }

    #[test]
    fn test_compose_empty_day() {
        let msg = compose(23, &WeatherReading::unavailable("Athens"), None, &[]);
        assert_eq!(msg.greeting, "Hello, night owl");
        assert_eq!(msg.message, "Nothing else on the calendar today. Your task list is clear.");
    }
}
