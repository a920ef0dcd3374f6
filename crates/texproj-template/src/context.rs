//! Render context: the closed set of variables a template may interpolate
//!
//! | Placeholder       | Source                          |
//! |-------------------|---------------------------------|
//! | `project_name`    | project display name            |
//! | `user.first_name` | owner's first name (or empty)   |
//! | `user.last_name`  | owner's last name (or empty)    |
//! | `year`            | current UTC year                |
//! | `month`           | English name of the UTC month   |

use chrono::{DateTime, Datelike, Month, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// Minimal projection of the project owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProjection {
    /// First name, if the profile has one
    pub first_name: Option<String>,
    /// Last name, if the profile has one
    pub last_name: Option<String>,
}

impl UserProjection {
    /// Create projection from both names
    #[inline]
    #[must_use]
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
        }
    }
}

/// Substitution environment for one render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    project_name: String,
    user: UserProjection,
    year: i32,
    month: Month,
}

impl RenderContext {
    /// Create context from explicit values
    #[inline]
    #[must_use]
    pub fn new(project_name: impl Into<String>, user: UserProjection, year: i32, month: Month) -> Self {
        Self {
            project_name: project_name.into(),
            user,
            year,
            month,
        }
    }

    /// Create context for the given instant (UTC year and month)
    #[must_use]
    pub fn at(project_name: impl Into<String>, user: UserProjection, instant: &DateTime<Utc>) -> Self {
        // month0() is always in 0..12
        let month = MONTHS[instant.month0() as usize];
        Self::new(project_name, user, instant.year(), month)
    }

    /// Create context for the current instant
    #[inline]
    #[must_use]
    pub fn now(project_name: impl Into<String>, user: UserProjection) -> Self {
        Self::at(project_name, user, &Utc::now())
    }

    /// Project display name
    #[inline]
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Owner projection
    #[inline]
    #[must_use]
    pub fn user(&self) -> &UserProjection {
        &self.user
    }

    /// UTC year
    #[inline]
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// UTC month
    #[inline]
    #[must_use]
    pub fn month(&self) -> Month {
        self.month
    }

    /// Resolve a placeholder name, `None` if it is outside the closed set
    pub(crate) fn resolve(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "project_name" => Cow::Borrowed(self.project_name.as_str()),
            "user.first_name" => Cow::Borrowed(self.user.first_name.as_deref().unwrap_or_default()),
            "user.last_name" => Cow::Borrowed(self.user.last_name.as_deref().unwrap_or_default()),
            "year" => Cow::Owned(self.year.to_string()),
            "month" => Cow::Borrowed(self.month.name()),
            _ => return None,
        };
        Some(value)
    }
}
