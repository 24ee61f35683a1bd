//! [`Args`] definitions.

use std::num::NonZeroUsize;

use clap::{Parser, Subcommand};
use common::DateTime;
use service::{
    domain::{booking, item, user},
    read::booking::list::Role,
};

/// Bookings of the items shared between users.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// [`Command`] to execute.
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Parses command line arguments, exiting the process on failure.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

/// Command to execute.
#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Books an item for the `[start, end)` interval.
    Create {
        /// ID of the user booking the item.
        #[arg(long)]
        booker: user::Id,

        /// ID of the item to book.
        #[arg(long)]
        item: item::Id,

        /// RFC 3339 moment the booking starts at.
        #[arg(long, value_parser = DateTime::from_rfc3339)]
        start: DateTime,

        /// RFC 3339 moment the booking ends at.
        #[arg(long, value_parser = DateTime::from_rfc3339)]
        end: DateTime,
    },

    /// Approves a booking as the owner of the booked item.
    Approve {
        /// ID of the booking to approve.
        #[arg(long)]
        booking: booking::Id,

        /// ID of the user owning the booked item.
        #[arg(long)]
        owner: user::Id,
    },

    /// Rejects a booking as the owner of the booked item.
    Reject {
        /// ID of the booking to reject.
        #[arg(long)]
        booking: booking::Id,

        /// ID of the user owning the booked item.
        #[arg(long)]
        owner: user::Id,
    },

    /// Shows a booking to its booker or to the owner of the booked item.
    Get {
        /// ID of the booking to show.
        #[arg(long)]
        booking: booking::Id,

        /// ID of the user asking for the booking.
        #[arg(long)]
        user: user::Id,
    },

    /// Lists bookings of a user, the latest starting first.
    List {
        /// ID of the user listing the bookings.
        #[arg(long)]
        user: user::Id,

        /// Role the user lists the bookings in (`BOOKER` or `OWNER`).
        #[arg(long, default_value_t = Role::Booker)]
        role: Role,

        /// State of the listed bookings (`ALL`, `CURRENT`, `PAST`, `FUTURE`,
        /// `WAITING` or `REJECTED`).
        #[arg(long)]
        state: Option<String>,

        /// Offset of the first listed booking.
        #[arg(long)]
        from: Option<usize>,

        /// Number of bookings in a page.
        #[arg(long)]
        size: Option<NonZeroUsize>,
    },

    /// Shows the last and the next bookings of items.
    ///
    /// A single item is shown as is, while several ones are shown as a map
    /// keyed by their IDs.
    Nearest {
        /// IDs of the items.
        #[arg(long = "item", required = true)]
        items: Vec<item::Id>,

        /// ID of the user asking for the bookings.
        #[arg(long)]
        requester: user::Id,
    },

    /// Lists items of an owner along with their last and next bookings.
    OwnerItems {
        /// ID of the user owning the items.
        #[arg(long)]
        owner: user::Id,

        /// Offset of the first listed item.
        #[arg(long)]
        from: Option<usize>,

        /// Number of items in a page.
        #[arg(long)]
        size: Option<NonZeroUsize>,
    },

    /// Checks whether a user may comment an item.
    CanComment {
        /// ID of the item to be commented.
        #[arg(long)]
        item: item::Id,

        /// ID of the user commenting the item.
        #[arg(long)]
        user: user::Id,

        /// Fail instead of answering `false`, telling the reason.
        #[arg(long)]
        strict: bool,
    },
}
