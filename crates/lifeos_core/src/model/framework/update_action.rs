//! Explicit partial-update values.

use serde::{Deserialize, Serialize};

/// Either leave a field alone or change it to a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "should_change", content = "value", rename_all = "snake_case")]
pub enum UpdateAction<T> {
    DoNothing,
    ChangeTo(T),
}

impl<T> Default for UpdateAction<T> {
    fn default() -> Self {
        Self::DoNothing
    }
}

impl<T> UpdateAction<T> {
    pub fn do_nothing() -> Self {
        Self::DoNothing
    }

    pub fn change_to(value: T) -> Self {
        Self::ChangeTo(value)
    }

    pub fn should_change(&self) -> bool {
        matches!(self, Self::ChangeTo(_))
    }

    /// The new value, or `current` when nothing changes.
    pub fn or_else(self, current: T) -> T {
        match self {
            Self::DoNothing => current,
            Self::ChangeTo(value) => value,
        }
    }

    pub fn transform<U>(self, f: impl FnOnce(T) -> U) -> UpdateAction<U> {
        match self {
            Self::DoNothing => UpdateAction::DoNothing,
            Self::ChangeTo(value) => UpdateAction::ChangeTo(f(value)),
        }
    }

    /// `false` for `DoNothing`, otherwise the predicate applied to the new value.
    pub fn test(&self, predicate: impl FnOnce(&T) -> bool) -> bool {
        match self {
            Self::DoNothing => false,
            Self::ChangeTo(value) => predicate(value),
        }
    }

    pub fn as_ref(&self) -> UpdateAction<&T> {
        match self {
            Self::DoNothing => UpdateAction::DoNothing,
            Self::ChangeTo(value) => UpdateAction::ChangeTo(value),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::DoNothing => None,
            Self::ChangeTo(value) => Some(value),
        }
    }
}

impl<T, E> UpdateAction<Result<T, E>> {
    pub fn transpose(self) -> Result<UpdateAction<T>, E> {
        match self {
            Self::DoNothing => Ok(UpdateAction::DoNothing),
            Self::ChangeTo(value) => value.map(UpdateAction::ChangeTo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UpdateAction;

    #[test]
    fn or_else_keeps_current_value_for_do_nothing() {
        assert_eq!(UpdateAction::<i32>::do_nothing().or_else(3), 3);
        assert_eq!(UpdateAction::change_to(7).or_else(3), 7);
    }

    #[test]
    fn transform_and_test_only_see_changes() {
        let action = UpdateAction::change_to(4).transform(|v| v * 2);
        assert_eq!(action, UpdateAction::ChangeTo(8));
        assert!(action.test(|v| *v == 8));
        assert!(!UpdateAction::<i32>::do_nothing().test(|_| true));
    }

    #[test]
    fn deserializes_from_tagged_form() {
        let action: UpdateAction<String> =
            serde_json::from_str(r#"{"should_change":"change_to","value":"x"}"#)
                .expect("tagged change");
        assert_eq!(action, UpdateAction::ChangeTo("x".to_string()));
        let action: UpdateAction<String> =
            serde_json::from_str(r#"{"should_change":"do_nothing"}"#).expect("tagged noop");
        assert_eq!(action, UpdateAction::DoNothing);
    }
}
