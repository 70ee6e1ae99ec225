//! Task classification values: statuses, sources, difficulty, Eisenhower quadrant.

use crate::model::framework::enum_value::enum_value;

enum_value! {
    pub enum Difficulty("difficulty") {
        Easy => "easy",
        Medium => "medium",
        Hard => "hard",
    }
}

enum_value! {
    /// Eisenhower-matrix quadrant.
    pub enum Eisen("eisen") {
        Regular => "regular",
        Important => "important",
        Urgent => "urgent",
        ImportantAndUrgent => "important_and_urgent",
    }
}

enum_value! {
    pub enum InboxTaskStatus("inbox_task_status") {
        NotStarted => "not_started",
        Accepted => "accepted",
        Recurring => "recurring",
        InProgress => "in_progress",
        Blocked => "blocked",
        NotDone => "not_done",
        Done => "done",
    }
}

impl InboxTaskStatus {
    /// Transition rank; statuses sharing a rank are interchangeable in ordering.
    pub fn rank(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Accepted | Self::Recurring => 1,
            Self::InProgress | Self::Blocked => 2,
            Self::NotDone | Self::Done => 3,
        }
    }

    pub fn is_accepted_or_more(self) -> bool {
        self.rank() >= 1
    }

    pub fn is_working(self) -> bool {
        self.rank() == 2
    }

    pub fn is_completed(self) -> bool {
        self.rank() == 3
    }
}

enum_value! {
    /// What created an inbox task.
    pub enum InboxTaskSource("inbox_task_source") {
        User => "user",
        WorkingMemCleanup => "working_mem_cleanup",
        Habit => "habit",
        Chore => "chore",
        BigPlan => "big_plan",
        Metric => "metric",
        PersonCatchUp => "person_catch_up",
        PersonBirthday => "person_birthday",
        SlackTask => "slack_task",
        EmailTask => "email_task",
    }
}

impl InboxTaskSource {
    /// Whether users may edit the fields a generator owns.
    pub fn allow_user_changes(self) -> bool {
        matches!(self, Self::User | Self::BigPlan)
    }

    pub fn is_generated(self) -> bool {
        !self.allow_user_changes()
    }
}

enum_value! {
    pub enum BigPlanStatus("big_plan_status") {
        NotStarted => "not_started",
        Accepted => "accepted",
        InProgress => "in_progress",
        Blocked => "blocked",
        NotDone => "not_done",
        Done => "done",
    }
}

impl BigPlanStatus {
    pub fn is_working(self) -> bool {
        matches!(self, Self::InProgress | Self::Blocked)
    }

    pub fn is_completed(self) -> bool {
        matches!(self, Self::NotDone | Self::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::{InboxTaskSource, InboxTaskStatus};

    #[test]
    fn status_ranks_follow_transition_order() {
        let ordered = [
            InboxTaskStatus::NotStarted,
            InboxTaskStatus::Accepted,
            InboxTaskStatus::Recurring,
            InboxTaskStatus::InProgress,
            InboxTaskStatus::Blocked,
            InboxTaskStatus::NotDone,
            InboxTaskStatus::Done,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].rank() <= pair[1].rank());
        }
        assert!(InboxTaskStatus::Accepted.rank() == InboxTaskStatus::Recurring.rank());
        assert!(InboxTaskStatus::Done.is_completed());
    }

    #[test]
    fn only_user_and_big_plan_sources_allow_edits() {
        assert!(InboxTaskSource::User.allow_user_changes());
        assert!(InboxTaskSource::BigPlan.allow_user_changes());
        assert!(!InboxTaskSource::Habit.allow_user_changes());
        assert!(InboxTaskSource::SlackTask.is_generated());
    }
}
