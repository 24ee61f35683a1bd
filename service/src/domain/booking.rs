//! [`Booking`] definitions.

use common::{define_kind, unit, DateTime, DateTimeOf};
use derive_more::{Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{item, user};
#[cfg(doc)]
use crate::domain::{Item, User};

/// Reservation of an [`Item`] by a [`User`] for the `[start, end)` interval.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Booking {
    /// ID of this [`Booking`].
    pub id: Id,

    /// ID of the booked [`Item`].
    pub item_id: item::Id,

    /// ID of the [`User`] who requested this [`Booking`].
    pub booker_id: user::Id,

    /// [`DateTime`] this [`Booking`] starts at.
    pub start: StartDateTime,

    /// [`DateTime`] this [`Booking`] ends at.
    pub end: EndDateTime,

    /// Current [`Status`] of this [`Booking`].
    pub status: Status,
}

impl Booking {
    /// Creates a new [`Status::Waiting`] [`Booking`] with a fresh [`Id`].
    #[must_use]
    pub fn new(
        item_id: item::Id,
        booker_id: user::Id,
        start: StartDateTime,
        end: EndDateTime,
    ) -> Self {
        Self {
            id: Id::new(),
            item_id,
            booker_id,
            start,
            end,
            status: Status::Waiting,
        }
    }

    /// Indicates whether this [`Booking`] has ended strictly before `now`.
    #[must_use]
    pub fn is_finished_at(&self, now: &DateTime) -> bool {
        self.end.is_before(now)
    }

    /// Indicates whether `now` lies strictly inside this [`Booking`].
    #[must_use]
    pub fn is_in_progress_at(&self, now: &DateTime) -> bool {
        self.start.is_before(now) && self.end.is_after(now)
    }

    /// Indicates whether this [`Booking`] starts strictly after `now`.
    #[must_use]
    pub fn is_upcoming_at(&self, now: &DateTime) -> bool {
        self.start.is_after(now)
    }

    /// Applies the owner's [`Decision`] to this [`Booking`].
    ///
    /// Re-asserting the [`Decision`] this [`Booking`] already carries is an
    /// error, while switching to the opposite one is allowed, so an approved
    /// [`Booking`] may still be rejected later and vice versa.
    ///
    /// # Errors
    ///
    /// With [`AlreadyDecided`] if this [`Booking`] is already in the
    /// [`Status`] the `decision` leads to.
    pub fn decide(&mut self, decision: Decision) -> Result<(), AlreadyDecided> {
        let status = decision.status();
        if self.status == status {
            return Err(AlreadyDecided(status));
        }
        self.status = status;
        Ok(())
    }
}

/// ID of a [`Booking`].
///
/// [`Id`]s are time-ordered, so a greater [`Id`] belongs to a [`Booking`]
/// created later.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new unique [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

define_kind! {
    #[doc = "Status of a [`Booking`]."]
    enum Status {
        #[doc = "[`Booking`] awaits the owner's [`Decision`]."]
        Waiting = 1,

        #[doc = "[`Booking`] is approved by the owner."]
        Approved = 2,

        #[doc = "[`Booking`] is rejected by the owner."]
        Rejected = 3,
    }
}

/// Decision of an [`Item`] owner upon a [`Booking`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Approve the [`Booking`].
    Approve,

    /// Reject the [`Booking`].
    Reject,
}

impl Decision {
    /// Returns the [`Status`] this [`Decision`] leads to.
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::Approve => Status::Approved,
            Self::Reject => Status::Rejected,
        }
    }
}

impl From<bool> for Decision {
    fn from(approve: bool) -> Self {
        if approve {
            Self::Approve
        } else {
            Self::Reject
        }
    }
}

/// Error of re-asserting a [`Decision`] a [`Booking`] already carries.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("`Booking` is already {}", _0.to_string().to_lowercase())]
pub struct AlreadyDecided(#[error(not(source))] pub Status);

/// [`DateTime`] a [`Booking`] starts at.
pub type StartDateTime = DateTimeOf<(Booking, unit::Start)>;

/// [`DateTime`] a [`Booking`] ends at.
pub type EndDateTime = DateTimeOf<(Booking, unit::End)>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{item, user};

    use super::{AlreadyDecided, Booking, Decision, Status};

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn now() -> DateTime {
        DateTime::from_rfc3339("2024-05-01T12:00:00Z").unwrap()
    }

    fn booking(start: DateTime, end: DateTime) -> Booking {
        Booking::new(
            item::Id::new(),
            user::Id::new(),
            start.coerce(),
            end.coerce(),
        )
    }

    #[test]
    fn starts_waiting() {
        assert_eq!(booking(now(), now() + HOUR).status, Status::Waiting);
    }

    #[test]
    fn repeated_decision_fails() {
        let mut b = booking(now(), now() + HOUR);

        b.decide(Decision::Approve).unwrap();
        assert_eq!(
            b.decide(Decision::Approve),
            Err(AlreadyDecided(Status::Approved)),
        );
        assert_eq!(b.status, Status::Approved);

        let mut b = booking(now(), now() + HOUR);

        b.decide(Decision::Reject).unwrap();
        assert_eq!(
            b.decide(Decision::Reject),
            Err(AlreadyDecided(Status::Rejected)),
        );
    }

    #[test]
    fn opposite_decision_flips_status() {
        let mut b = booking(now(), now() + HOUR);

        b.decide(Decision::Approve).unwrap();
        b.decide(Decision::Reject).unwrap();
        assert_eq!(b.status, Status::Rejected);

        b.decide(Decision::Approve).unwrap();
        assert_eq!(b.status, Status::Approved);
    }

    #[test]
    fn already_decided_message() {
        assert_eq!(
            AlreadyDecided(Status::Approved).to_string(),
            "`Booking` is already approved",
        );
    }

    #[test]
    fn time_predicates_are_strict() {
        let past = booking(now() - 2 * HOUR, now() - HOUR);
        let current = booking(now() - HOUR, now() + HOUR);
        let future = booking(now() + HOUR, now() + 2 * HOUR);
        let starts_now = booking(now(), now() + HOUR);
        let ends_now = booking(now() - HOUR, now());

        assert!(past.is_finished_at(&now()));
        assert!(current.is_in_progress_at(&now()));
        assert!(future.is_upcoming_at(&now()));

        assert!(!starts_now.is_upcoming_at(&now()));
        assert!(!starts_now.is_in_progress_at(&now()));
        assert!(!ends_now.is_finished_at(&now()));
        assert!(!ends_now.is_in_progress_at(&now()));
    }

    #[test]
    fn decision_from_flag() {
        assert_eq!(Decision::from(true), Decision::Approve);
        assert_eq!(Decision::from(false), Decision::Reject);
    }
}
