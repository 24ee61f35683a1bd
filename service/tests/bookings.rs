//! Scenarios of the [`Booking`] lifecycle run against the in-memory database.

use std::{num::NonZeroUsize, time::Duration};

use common::{clock, operations::Insert, DateTime, Handler as _};
use service::{
    command::{self, AuthorizeComment, CreateBooking, DecideBooking},
    domain::{
        booking::{Decision, Status},
        item, user, Booking, Item, User,
    },
    infra::Memory,
    query::{self, nearest_bookings, CommentEligibility},
    read::booking::list::Role,
    Config, Service,
};

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

type TestService = Service<Memory, clock::Fixed>;

fn now() -> DateTime {
    DateTime::from_rfc3339("2024-05-01T12:00:00Z").unwrap()
}

fn setup() -> TestService {
    Service::with_clock(
        Config::default(),
        Memory::new(),
        clock::Fixed::at(now()),
    )
}

async fn seed_user(service: &TestService, name: &str) -> user::Id {
    let user = User {
        id: user::Id::new(),
        name: name.parse().unwrap(),
        email: format!("{}@example.com", name.to_lowercase()).parse().unwrap(),
    };
    let id = user.id;
    service.database().execute(Insert(user)).await.unwrap();
    id
}

async fn seed_item(
    service: &TestService,
    owner_id: user::Id,
    available: bool,
) -> item::Id {
    let item = Item {
        id: item::Id::new(),
        owner_id,
        name: "Drill".parse().unwrap(),
        description: "Cordless, with two batteries".parse().unwrap(),
        available,
        request_id: None,
    };
    let id = item.id;
    service.database().execute(Insert(item)).await.unwrap();
    id
}

async fn book(
    service: &TestService,
    booker_id: user::Id,
    item_id: item::Id,
    start: DateTime,
    end: DateTime,
) -> Booking {
    service
        .execute(CreateBooking {
            booker_id,
            item_id,
            start: start.coerce(),
            end: end.coerce(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn creation_checks_run_in_order() {
    use command::create_booking::ExecutionError as E;

    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let unavailable = seed_item(&service, owner, false).await;
    let available = seed_item(&service, owner, true).await;

    let create = |booker_id, item_id| CreateBooking {
        booker_id,
        item_id,
        start: (now() + DAY).coerce(),
        end: (now() + DAY * 2).coerce(),
    };

    // Unknown booker wins over unknown item.
    let err = service
        .execute(create(user::Id::new(), item::Id::new()))
        .await
        .unwrap_err();
    assert!(matches!(err.into_inner(), E::UserNotExists(_)));

    let err = service
        .execute(create(booker, item::Id::new()))
        .await
        .unwrap_err();
    assert!(matches!(err.into_inner(), E::ItemNotExists(_)));

    // Unavailability wins over self-booking.
    let err = service
        .execute(create(owner, unavailable))
        .await
        .unwrap_err();
    assert!(matches!(err.into_inner(), E::ItemNotAvailable(_)));

    let err = service
        .execute(create(owner, available))
        .await
        .unwrap_err();
    assert!(matches!(err.into_inner(), E::SelfBooking(_)));

    let booking = service.execute(create(booker, available)).await.unwrap();
    assert_eq!(booking.status, Status::Waiting);
    assert_eq!(booking.booker_id, booker);
}

#[tokio::test]
async fn decisions_are_asymmetric() {
    use command::decide_booking::ExecutionError as E;

    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let item = seed_item(&service, owner, true).await;
    let booking =
        book(&service, booker, item, now() + DAY, now() + DAY * 2).await;

    let decide = |decision| DecideBooking {
        booking_id: booking.id,
        owner_id: owner,
        decision,
    };

    let approved = service.execute(decide(Decision::Approve)).await.unwrap();
    assert_eq!(approved.status, Status::Approved);

    let err = service
        .execute(decide(Decision::Approve))
        .await
        .unwrap_err();
    assert!(matches!(
        err.into_inner(),
        E::AlreadyDecided(_, Status::Approved),
    ));

    let rejected = service.execute(decide(Decision::Reject)).await.unwrap();
    assert_eq!(rejected.status, Status::Rejected);

    let err = service
        .execute(decide(Decision::Reject))
        .await
        .unwrap_err();
    assert!(matches!(
        err.into_inner(),
        E::AlreadyDecided(_, Status::Rejected),
    ));

    let stored = service
        .execute(query::booking::ById {
            booking_id: booking.id,
            user_id: booker,
        })
        .await
        .unwrap();
    assert_eq!(stored.status, Status::Rejected);
}

#[tokio::test]
async fn only_owner_decides() {
    use command::decide_booking::ExecutionError as E;

    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let item = seed_item(&service, owner, true).await;
    let booking =
        book(&service, booker, item, now() + DAY, now() + DAY * 2).await;

    let err = service
        .execute(DecideBooking {
            booking_id: booking.id,
            owner_id: booker,
            decision: Decision::Approve,
        })
        .await
        .unwrap_err();
    assert!(matches!(err.into_inner(), E::BookingNotExists(_)));
}

#[tokio::test]
async fn concurrent_decisions_are_serialized() {
    use command::decide_booking::ExecutionError as E;

    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let item = seed_item(&service, owner, true).await;
    let booking =
        book(&service, booker, item, now() + DAY, now() + DAY * 2).await;

    let approve = || DecideBooking {
        booking_id: booking.id,
        owner_id: owner,
        decision: Decision::Approve,
    };

    let (first, second) =
        tokio::join!(service.execute(approve()), service.execute(approve()));

    let (won, lost) = match (first, second) {
        (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
        (first, second) => {
            panic!("exactly one decision must win: {first:?}, {second:?}")
        }
    };
    assert_eq!(won.status, Status::Approved);
    assert!(matches!(
        lost.into_inner(),
        E::AlreadyDecided(id, Status::Approved) if id == booking.id,
    ));
}

#[tokio::test]
async fn booking_is_visible_to_participants_only() {
    use query::booking::ExecutionError as E;

    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let stranger = seed_user(&service, "Stranger").await;
    let item = seed_item(&service, owner, true).await;
    let booking =
        book(&service, booker, item, now() + DAY, now() + DAY * 2).await;

    for user_id in [owner, booker] {
        let found = service
            .execute(query::booking::ById {
                booking_id: booking.id,
                user_id,
            })
            .await
            .unwrap();
        assert_eq!(found, booking);
    }

    let err = service
        .execute(query::booking::ById {
            booking_id: booking.id,
            user_id: stranger,
        })
        .await
        .unwrap_err();
    assert!(matches!(err.into_inner(), E::BookingNotExists(_)));
}

#[tokio::test]
async fn boundaries_belong_to_no_temporal_state() {
    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let item = seed_item(&service, owner, true).await;
    let ending_now = book(&service, booker, item, now() - HOUR, now()).await;
    let starting_now = book(&service, booker, item, now(), now() + HOUR).await;

    for state in ["CURRENT", "PAST", "FUTURE"] {
        let page = service
            .execute(query::bookings::List {
                user_id: booker,
                role: Role::Booker,
                state: Some(state.to_owned()),
                from: None,
                size: None,
            })
            .await
            .unwrap();
        assert!(page.is_empty(), "{state} state lists a boundary booking");
    }

    let all = service
        .execute(query::bookings::List {
            user_id: booker,
            role: Role::Booker,
            state: None,
            from: None,
            size: None,
        })
        .await
        .unwrap();
    assert_eq!(
        all.nodes.iter().map(|b| b.id).collect::<Vec<_>>(),
        [starting_now.id, ending_now.id],
    );
}

#[tokio::test]
async fn unknown_state_is_rejected() {
    use query::bookings::ExecutionError as E;

    let service = setup();
    let booker = seed_user(&service, "Booker").await;

    let err = service
        .execute(query::bookings::List {
            user_id: booker,
            role: Role::Booker,
            state: Some("APPROVED".to_owned()),
            from: None,
            size: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err.into_inner(), E::InvalidState(s) if s == "APPROVED"));

    let err = service
        .execute(query::bookings::List {
            user_id: user::Id::new(),
            role: Role::Owner,
            state: None,
            from: None,
            size: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err.into_inner(), E::UserNotExists(_)));
}

#[tokio::test]
async fn listing_is_paged_by_start_descending() {
    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let item = seed_item(&service, owner, true).await;

    let mut bookings = vec![];
    for days in [3, 1, 5, 2, 4] {
        let start = now() + DAY * days;
        bookings.push(book(&service, booker, item, start, start + HOUR).await);
    }
    bookings.sort_by(|a, b| b.start.cmp(&a.start));

    let list = |from| query::bookings::List {
        user_id: owner,
        role: Role::Owner,
        state: Some("FUTURE".to_owned()),
        from: Some(from),
        size: NonZeroUsize::new(2),
    };

    let first = service.execute(list(0)).await.unwrap();
    assert_eq!(first.number, 0);
    assert_eq!(
        first.nodes.iter().map(|b| b.id).collect::<Vec<_>>(),
        [bookings[0].id, bookings[1].id],
    );

    // `from` is rounded down to the beginning of its page.
    let second = service.execute(list(3)).await.unwrap();
    assert_eq!(second.number, 1);
    assert_eq!(
        second.nodes.iter().map(|b| b.id).collect::<Vec<_>>(),
        [bookings[2].id, bookings[3].id],
    );

    let last = service.execute(list(4)).await.unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last.nodes[0].id, bookings[4].id);
}

#[tokio::test]
async fn nearest_next_is_the_latest_upcoming() {
    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let item = seed_item(&service, owner, true).await;

    let past = book(&service, booker, item, now() - DAY * 2, now() - DAY).await;
    for days in [1, 3, 2] {
        let start = now() + DAY * days;
        book(&service, booker, item, start, start + HOUR).await;
    }

    let nearest = service
        .execute(nearest_bookings::ForItem {
            item_id: item,
            requester_id: owner,
        })
        .await
        .unwrap();

    assert_eq!(nearest.last.map(|s| s.id), Some(past.id));
    assert_eq!(
        nearest.next.map(|s| s.start.coerce::<()>()),
        Some(now() + DAY * 3),
    );
}

#[tokio::test]
async fn nearest_next_requires_last() {
    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let item = seed_item(&service, owner, true).await;
    book(&service, booker, item, now() + DAY, now() + DAY * 2).await;

    let nearest = service
        .execute(nearest_bookings::ForItem {
            item_id: item,
            requester_id: owner,
        })
        .await
        .unwrap();

    assert_eq!(nearest.last, None);
    assert_eq!(nearest.next, None);
}

#[tokio::test]
async fn owner_items_carry_nearest_bookings() {
    use nearest_bookings::ExecutionError as E;

    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let booked = seed_item(&service, owner, true).await;
    let idle = seed_item(&service, owner, true).await;
    let past =
        book(&service, booker, booked, now() - DAY * 2, now() - DAY).await;

    let page = service
        .execute(nearest_bookings::ForOwner {
            owner_id: owner,
            from: None,
            size: None,
        })
        .await
        .unwrap();

    assert_eq!(
        page.nodes.iter().map(|(i, _)| i.id).collect::<Vec<_>>(),
        [booked, idle],
    );
    assert_eq!(page.nodes[0].1.last.map(|s| s.id), Some(past.id));
    assert_eq!(page.nodes[1].1.last, None);

    let err = service
        .execute(nearest_bookings::ForOwner {
            owner_id: user::Id::new(),
            from: None,
            size: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err.into_inner(), E::UserNotExists(_)));
}

#[tokio::test]
async fn comment_requires_ended_booking() {
    use command::authorize_comment::ExecutionError as E;

    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let ended = seed_user(&service, "Ended").await;
    let ongoing = seed_user(&service, "Ongoing").await;
    let item = seed_item(&service, owner, true).await;
    book(&service, ended, item, now() - HOUR * 3, now() - HOUR).await;
    book(&service, ongoing, item, now() - HOUR * 3, now() + HOUR).await;

    let eligible = |user_id| CommentEligibility {
        item_id: item,
        user_id,
    };
    assert!(service.execute(eligible(ended)).await.unwrap());
    assert!(!service.execute(eligible(ongoing)).await.unwrap());

    service
        .execute(AuthorizeComment {
            item_id: item,
            user_id: ended,
        })
        .await
        .unwrap();
    let err = service
        .execute(AuthorizeComment {
            item_id: item,
            user_id: ongoing,
        })
        .await
        .unwrap_err();
    assert!(matches!(err.into_inner(), E::NoPriorBooking(..)));

    // Once the clock passes its end, the ongoing booking counts as well.
    service.clock().set(now() + HOUR * 2);
    assert!(service.execute(eligible(ongoing)).await.unwrap());
}

#[tokio::test]
async fn booking_end_to_end() {
    let service = setup();
    let owner = seed_user(&service, "Owner").await;
    let booker = seed_user(&service, "Booker").await;
    let item = seed_item(&service, owner, true).await;

    let booking =
        book(&service, booker, item, now() + DAY, now() + DAY * 2).await;
    service
        .execute(DecideBooking {
            booking_id: booking.id,
            owner_id: owner,
            decision: Decision::Approve,
        })
        .await
        .unwrap();

    let waiting = service
        .execute(query::bookings::List {
            user_id: owner,
            role: Role::Owner,
            state: Some("WAITING".to_owned()),
            from: None,
            size: None,
        })
        .await
        .unwrap();
    assert!(waiting.is_empty());

    let all = service
        .execute(query::bookings::List {
            user_id: owner,
            role: Role::Owner,
            state: Some("ALL".to_owned()),
            from: None,
            size: None,
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    let future = service
        .execute(query::bookings::List {
            user_id: booker,
            role: Role::Booker,
            state: Some("FUTURE".to_owned()),
            from: None,
            size: None,
        })
        .await
        .unwrap();
    assert_eq!(future.len(), 1);
    assert_eq!(future.nodes[0].status, Status::Approved);

    // Booker isn't the owner, so sees no nearest bookings.
    let nearest = service
        .execute(nearest_bookings::ForItem {
            item_id: item,
            requester_id: booker,
        })
        .await
        .unwrap();
    assert_eq!(nearest.last, None);

    service.clock().set(now() + DAY * 3);
    let past = service
        .execute(query::bookings::List {
            user_id: booker,
            role: Role::Booker,
            state: Some("PAST".to_owned()),
            from: None,
            size: None,
        })
        .await
        .unwrap();
    assert_eq!(
        past.nodes.iter().map(|b| b.id).collect::<Vec<_>>(),
        [booking.id],
    );
}
