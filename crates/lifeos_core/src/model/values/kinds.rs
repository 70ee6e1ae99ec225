//! Smaller closed enums used across concepts.

use crate::model::framework::enum_value::enum_value;

enum_value! {
    pub enum ScheduleStreamColor("schedule_stream_color") {
        Blue => "blue",
        Green => "green",
        Red => "red",
        Orange => "orange",
        Violet => "violet",
        Yellow => "yellow",
        Cyan => "cyan",
        Gray => "gray",
    }
}

enum_value! {
    pub enum ScheduleSource("schedule_source") {
        User => "user",
        ExternalIcal => "external_ical",
    }
}

enum_value! {
    pub enum MetricUnit("metric_unit") {
        Count => "count",
        Monetary => "monetary",
        Weight => "weight",
        Minutes => "minutes",
    }
}

enum_value! {
    pub enum PersonRelationship("person_relationship") {
        Family => "family",
        Friend => "friend",
        Acquaintance => "acquaintance",
        SchoolBuddy => "school_buddy",
        WorkBuddy => "work_buddy",
        Colleague => "colleague",
        Other => "other",
    }
}

enum_value! {
    /// Concept a note is attached to.
    pub enum NoteDomain("note_domain") {
        InboxTask => "inbox_task",
        Project => "project",
        BigPlan => "big_plan",
        Habit => "habit",
        Chore => "chore",
        Metric => "metric",
        MetricEntry => "metric_entry",
        Person => "person",
        SmartList => "smart_list",
        SmartListItem => "smart_list_item",
        Vacation => "vacation",
        Doc => "doc",
        Journal => "journal",
        WorkingMem => "working_mem",
        ScheduleStream => "schedule_stream",
        ScheduleEventInDay => "schedule_event_in_day",
        ScheduleEventFullDays => "schedule_event_full_days",
        TimePlan => "time_plan",
    }
}

enum_value! {
    /// Owner kind of an in-day time block.
    pub enum TimeEventInDayNamespace("time_event_in_day_namespace") {
        InboxTask => "inbox_task",
        ScheduleEventInDay => "schedule_event_in_day",
    }
}

enum_value! {
    /// Owner kind of a full-days time block.
    pub enum TimeEventFullDaysNamespace("time_event_full_days_namespace") {
        ScheduleFullDaysEvent => "schedule_full_days_event",
        PersonBirthday => "person_birthday",
        Vacation => "vacation",
    }
}

enum_value! {
    pub enum TimePlanActivityTarget("time_plan_activity_target") {
        InboxTask => "inbox_task",
        BigPlan => "big_plan",
    }
}

enum_value! {
    pub enum TimePlanActivityKind("time_plan_activity_kind") {
        Finish => "finish",
        MakeProgress => "make_progress",
    }
}

enum_value! {
    pub enum TimePlanActivityFeasibility("time_plan_activity_feasibility") {
        MustDo => "must_do",
        NiceToHave => "nice_to_have",
        Stretch => "stretch",
    }
}

enum_value! {
    pub enum JournalSource("journal_source") {
        User => "user",
        Recurring => "recurring",
    }
}

enum_value! {
    pub enum HomeTabTarget("home_tab_target") {
        BigScreen => "big_screen",
        SmallScreen => "small_screen",
    }
}

impl HomeTabTarget {
    pub fn max_columns(self) -> u32 {
        match self {
            Self::BigScreen => 3,
            Self::SmallScreen => 1,
        }
    }
}

enum_value! {
    pub enum WidgetDimension("widget_dimension") {
        Dim1x1 => "1x1",
        Dim1x2 => "1x2",
        Dim1x3 => "1x3",
        Dim2x1 => "2x1",
        Dim2x2 => "2x2",
        Dim2x3 => "2x3",
        Dim3x1 => "3x1",
        Dim3x2 => "3x2",
        Dim3x3 => "3x3",
    }
}

impl WidgetDimension {
    /// `(rows, columns)`.
    pub fn size(self) -> (u32, u32) {
        match self {
            Self::Dim1x1 => (1, 1),
            Self::Dim1x2 => (1, 2),
            Self::Dim1x3 => (1, 3),
            Self::Dim2x1 => (2, 1),
            Self::Dim2x2 => (2, 2),
            Self::Dim2x3 => (2, 3),
            Self::Dim3x1 => (3, 1),
            Self::Dim3x2 => (3, 2),
            Self::Dim3x3 => (3, 3),
        }
    }
}

enum_value! {
    pub enum WidgetType("widget_type") {
        Motd => "motd",
        WorkingMem => "working_mem",
        TimePlanView => "time_plan_view",
        ScheduleDay => "schedule_day",
        HabitInboxTasks => "habit_inbox_tasks",
        ChoreInboxTasks => "chore_inbox_tasks",
        KeyHabitsStreaks => "key_habits_streaks",
        KeyBigPlans => "key_big_plans",
        UpcomingBirthdays => "upcoming_birthdays",
        GamificationOverview => "gamification_overview",
    }
}

impl WidgetType {
    pub fn allowed_dimensions(self) -> &'static [WidgetDimension] {
        use WidgetDimension::*;
        match self {
            Self::Motd => &[Dim1x1, Dim1x2, Dim1x3],
            Self::WorkingMem => &[Dim1x1, Dim2x1, Dim3x1, Dim2x2],
            Self::TimePlanView | Self::ScheduleDay => &[Dim2x1, Dim3x1, Dim2x2, Dim3x2],
            Self::HabitInboxTasks | Self::ChoreInboxTasks => &[Dim1x1, Dim2x1, Dim3x1],
            Self::KeyHabitsStreaks => &[Dim1x1, Dim1x2, Dim1x3, Dim2x3],
            Self::KeyBigPlans => &[Dim1x1, Dim2x1, Dim1x2],
            Self::UpcomingBirthdays => &[Dim1x1, Dim2x1],
            Self::GamificationOverview => &[Dim1x1, Dim1x2],
        }
    }

    pub fn allowed_targets(self) -> &'static [HomeTabTarget] {
        match self {
            Self::TimePlanView | Self::KeyHabitsStreaks => &[HomeTabTarget::BigScreen],
            _ => &[HomeTabTarget::BigScreen, HomeTabTarget::SmallScreen],
        }
    }
}

enum_value! {
    /// Entity families the generation engine can project.
    pub enum SyncTarget("sync_target") {
        WorkingMem => "working_mem",
        Habits => "habits",
        Chores => "chores",
        Metrics => "metrics",
        Persons => "persons",
        SlackTasks => "slack_tasks",
        EmailTasks => "email_tasks",
    }
}

enum_value! {
    /// Entity families swept by garbage collection.
    pub enum GcTarget("gc_target") {
        InboxTasks => "inbox_tasks",
        Habits => "habits",
        Chores => "chores",
        BigPlans => "big_plans",
        Docs => "docs",
        MetricEntries => "metric_entries",
        SlackTasks => "slack_tasks",
        EmailTasks => "email_tasks",
    }
}

#[cfg(test)]
mod tests {
    use super::{WidgetDimension, WidgetType};

    #[test]
    fn widget_dimension_tags_parse() {
        assert_eq!("2x3".parse::<WidgetDimension>().expect("tag"), WidgetDimension::Dim2x3);
        assert_eq!(WidgetDimension::Dim2x3.size(), (2, 3));
    }

    #[test]
    fn every_widget_type_allows_some_dimension() {
        for widget in WidgetType::ALL {
            assert!(!widget.allowed_dimensions().is_empty());
            assert!(!widget.allowed_targets().is_empty());
        }
    }
}
