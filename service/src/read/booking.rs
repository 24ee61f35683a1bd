//! [`Booking`] read model definitions.

use common::DateTime;
use serde::Serialize;

use crate::domain::{booking, item, user, Booking};
#[cfg(doc)]
use crate::domain::{Item, User};

/// Wrapper around a [`Booking`] indicating that it was selected on behalf of
/// the owner of the booked [`Item`].
#[derive(Clone, Copy, Debug)]
pub struct Owned<T>(pub T);

/// Wrapper around a [`Booking`] indicating that it was selected on behalf of
/// either its booker or the owner of the booked [`Item`].
#[derive(Clone, Copy, Debug)]
pub struct Participated<T>(pub T);

/// Wrapper around a [`Booking`] indicating that it has ended.
#[derive(Clone, Copy, Debug)]
pub struct Completed<T>(pub T);

/// Selector of a [`Completed`] [`Booking`] of an [`Item`] by a [`User`].
#[derive(Clone, Copy, Debug)]
pub struct CompletedBy {
    /// ID of the booked [`Item`].
    pub item_id: item::Id,

    /// ID of the [`User`] who booked the [`Item`].
    pub booker_id: user::Id,

    /// Moment the [`Booking`] must have ended before.
    pub now: DateTime,
}

/// Short view of a [`Booking`] attached to an [`Item`] shown to its owner.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Short {
    /// ID of the [`Booking`].
    pub id: booking::Id,

    /// ID of the [`User`] who booked the [`Item`].
    pub booker_id: user::Id,

    /// [`DateTime`] the [`Booking`] starts at.
    pub start: booking::StartDateTime,

    /// [`DateTime`] the [`Booking`] ends at.
    pub end: booking::EndDateTime,
}

impl From<&Booking> for Short {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id,
            booker_id: b.booker_id,
            start: b.start,
            end: b.end,
        }
    }
}

/// The most relevant past and future [`Booking`]s of a single [`Item`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Nearest {
    /// [`Booking`] that has already started, ending the latest.
    pub last: Option<Short>,

    /// Upcoming [`Booking`] starting the latest.
    ///
    /// Always [`None`] if there is no [`Nearest::last`] one.
    pub next: Option<Short>,
}

impl Nearest {
    /// Resolves the [`Nearest`] [`Booking`]s out of the provided ones of a
    /// single [`Item`].
    ///
    /// Only bookings that have ended or are in progress at `now` qualify as
    /// [`Nearest::last`], and only bookings starting strictly after `now`
    /// qualify as [`Nearest::next`]. Among the [`Nearest::next`] candidates
    /// the one starting the latest wins, not the soonest. Ties are broken in
    /// favor of the most recently created [`Booking`].
    #[must_use]
    pub fn resolve<'b>(
        bookings: impl IntoIterator<Item = &'b Booking>,
        now: &DateTime,
    ) -> Self {
        let bookings = bookings.into_iter().collect::<Vec<_>>();

        let Some(last) = bookings
            .iter()
            .filter(|b| b.is_finished_at(now) || b.is_in_progress_at(now))
            .max_by_key(|b| (b.end, b.id))
        else {
            return Self::default();
        };

        let next = bookings
            .iter()
            .filter(|b| b.is_upcoming_at(now))
            .max_by_key(|b| (b.start, b.id));

        Self {
            last: Some(Short::from(*last)),
            next: next.map(|b| Short::from(*b)),
        }
    }
}

pub mod list {
    //! [`Booking`]s list definitions.

    use std::cmp::Ordering;

    use common::{define_pagination, pagination::Order, DateTime};
    use strum::{Display, EnumString};

    use crate::domain::{booking, user, Booking};
    #[cfg(doc)]
    use crate::domain::{Item, User};

    define_pagination!(Booking, Predicate);

    /// [`Order`] of [`Booking`]s by their start, and then by their ID.
    pub const ORDER: Order = Order::Descending;

    /// Compares [`Booking`]s in the listing [`ORDER`].
    #[must_use]
    pub fn compare(a: &Booking, b: &Booking) -> Ordering {
        ORDER
            .apply(a.start.cmp(&b.start))
            .then_with(|| ORDER.apply(a.id.cmp(&b.id)))
    }

    /// Role the acting [`User`] lists [`Booking`]s in.
    #[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, PartialEq)]
    #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
    pub enum Role {
        /// [`Booking`]s made by the acting [`User`].
        Booker,

        /// [`Booking`]s of the [`Item`]s owned by the acting [`User`].
        Owner,
    }

    /// State of the listed [`Booking`]s.
    #[derive(
        Clone, Copy, Debug, Default, Display, EnumString, Eq, Hash, PartialEq,
    )]
    #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
    pub enum State {
        /// Every [`Booking`].
        #[default]
        All,

        /// [`Booking`]s in progress.
        Current,

        /// [`Booking`]s that have ended.
        Past,

        /// [`Booking`]s that have not started yet.
        Future,

        /// [`Booking`]s awaiting the owner's decision.
        Waiting,

        /// [`Booking`]s rejected by the owner.
        Rejected,
    }

    /// Filter of the listed [`Booking`]s.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Filter {
        /// [`Role`] of the acting [`User`].
        pub role: Role,

        /// [`State`] of the listed [`Booking`]s.
        pub state: State,
    }

    impl Filter {
        /// Builds the [`Predicate`] selecting [`Booking`]s matching this
        /// [`Filter`] on behalf of the `actor` at the `now` moment.
        #[must_use]
        pub fn predicate(self, actor: user::Id, now: DateTime) -> Predicate {
            use Refinement as R;

            let refinement = match self.state {
                State::All => None,
                State::Current => Some(R::Current(now)),
                State::Past => Some(R::Past(now)),
                State::Future => Some(R::Future(now)),
                State::Waiting => Some(R::Status(booking::Status::Waiting)),
                State::Rejected => Some(R::Status(booking::Status::Rejected)),
            };

            Predicate {
                role: self.role,
                actor,
                refinement,
            }
        }
    }

    /// Predicate a listed [`Booking`] satisfies.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Predicate {
        /// [`Role`] the [`Predicate::actor`] relates to a [`Booking`] in.
        pub role: Role,

        /// ID of the acting [`User`].
        pub actor: user::Id,

        /// Additional [`Refinement`] of the [`Role`] scope, if any.
        pub refinement: Option<Refinement>,
    }

    impl Predicate {
        /// Checks whether the provided [`Booking`] of an [`Item`] owned by
        /// the `owner_id` [`User`] satisfies this [`Predicate`].
        #[must_use]
        pub fn matches(&self, booking: &Booking, owner_id: user::Id) -> bool {
            let in_scope = match self.role {
                Role::Booker => booking.booker_id == self.actor,
                Role::Owner => owner_id == self.actor,
            };
            in_scope && self.refinement.is_none_or(|r| r.matches(booking))
        }
    }

    /// Refinement of the [`Role`] scope of a [`Predicate`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum Refinement {
        /// [`Booking`] started strictly before and ends strictly after the
        /// provided moment.
        Current(DateTime),

        /// [`Booking`] ended strictly before the provided moment.
        Past(DateTime),

        /// [`Booking`] starts strictly after the provided moment.
        Future(DateTime),

        /// [`Booking`] has the provided [`booking::Status`].
        Status(booking::Status),
    }

    impl Refinement {
        /// Checks whether the provided [`Booking`] satisfies this
        /// [`Refinement`].
        #[must_use]
        pub fn matches(&self, booking: &Booking) -> bool {
            match self {
                Self::Current(now) => booking.is_in_progress_at(now),
                Self::Past(now) => booking.is_finished_at(now),
                Self::Future(now) => booking.is_upcoming_at(now),
                Self::Status(status) => booking.status == *status,
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{item, user, Booking};

    use super::{Nearest, Short};

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

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
    fn next_is_the_latest_starting_one() {
        let last = booking(now() - 2 * DAY, now() - DAY);
        let first = booking(now() + DAY, now() + DAY + DAY / 2);
        let third = booking(now() + 3 * DAY, now() + 4 * DAY);
        let second = booking(now() + 2 * DAY, now() + 2 * DAY + DAY / 2);

        let nearest = Nearest::resolve([&last, &first, &third, &second], &now());

        assert_eq!(nearest.last, Some(Short::from(&last)));
        assert_eq!(nearest.next, Some(Short::from(&third)));
    }

    #[test]
    fn no_last_means_no_next() {
        let upcoming = booking(now() + DAY, now() + 2 * DAY);

        assert_eq!(Nearest::resolve([&upcoming], &now()), Nearest::default());
        assert_eq!(Nearest::resolve([], &now()), Nearest::default());
    }

    #[test]
    fn last_is_the_latest_ending_one() {
        let old = booking(now() - 3 * DAY, now() - 2 * DAY);
        let current = booking(now() - DAY, now() + DAY);
        let recent = booking(now() - 2 * DAY, now() - DAY);

        let nearest = Nearest::resolve([&old, &current, &recent], &now());

        assert_eq!(nearest.last, Some(Short::from(&current)));
        assert_eq!(nearest.next, None);
    }

    #[test]
    fn ties_prefer_the_latest_created() {
        let first = booking(now() - 2 * DAY, now() - DAY);
        let second = booking(now() - 2 * DAY, now() - DAY);

        let nearest = Nearest::resolve([&second, &first], &now());

        assert_eq!(nearest.last.map(|s| s.id), Some(second.id));
    }

    #[test]
    fn next_ties_prefer_the_latest_created() {
        let last = booking(now() - 2 * DAY, now() - DAY);
        let first = booking(now() + DAY, now() + 2 * DAY);
        let second = booking(now() + DAY, now() + 3 * DAY);

        for order in [[&first, &second], [&second, &first]] {
            let [a, b] = order;
            let nearest = Nearest::resolve([&last, a, b], &now());

            assert_eq!(nearest.next.map(|s| s.id), Some(second.id));
        }
    }

    #[test]
    fn starting_now_is_neither_last_nor_next() {
        let starting = booking(now(), now() + DAY);

        assert_eq!(Nearest::resolve([&starting], &now()), Nearest::default());
    }
}
