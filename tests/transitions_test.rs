use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};

use door_tickets::{
    error::{Refusal, TicketError},
    models::{Staff, Ticket, TicketState, TicketStats, TicketSummary},
    services::TicketService,
    store::{MemoryTicketStore, Stat, StoreError, TicketStore},
};
use fake::{faker::name::en::{FirstName, LastName}, Fake};

const TICKET_MAX: i32 = 1050;

fn setup() -> (Arc<MemoryTicketStore>, TicketService) {
    let store = Arc::new(MemoryTicketStore::seeded(TICKET_MAX, 10));
    let mut sold = Ticket::unsold(125, 10);
    sold.sold = true;
    sold.first_name = Some("Luke".into());
    sold.last_name = Some("Skywalker".into());
    sold.vendor = Some("Ergin Schellen".into());
    store.put_ticket(sold);

    let tickets = TicketService::new(store.clone(), TICKET_MAX, Duration::from_secs(1));
    (store, tickets)
}

#[tokio::test]
async fn entrance_and_rollback_of_a_sold_ticket() {
    let (store, tickets) = setup();
    assert_eq!(tickets.classify(125).await.unwrap(), TicketState::Sold);

    tickets.set_entered(125).await.unwrap();
    assert_eq!(tickets.classify(125).await.unwrap(), TicketState::SoldEntered);
    let first_stamp = store.get_ticket(125).unwrap().entered;
    assert!(first_stamp.is_some());

    let err = tickets.set_entered(125).await.unwrap_err();
    assert!(matches!(err, TicketError::Precondition(Refusal::AlreadyEntered)));
    // refused check-in keeps the first entry time
    assert_eq!(store.get_ticket(125).unwrap().entered, first_stamp);

    tickets.rollback_entrance(125).await.unwrap();
    assert_eq!(tickets.classify(125).await.unwrap(), TicketState::Sold);
    // rollback never touches the sale
    assert!(store.get_ticket(125).unwrap().sold);

    let err = tickets.rollback_entrance(125).await.unwrap_err();
    assert!(matches!(err, TicketError::Precondition(Refusal::NotEntered)));

    tickets.set_entered(125).await.unwrap();
    assert_eq!(tickets.classify(125).await.unwrap(), TicketState::SoldEntered);
}

#[tokio::test]
async fn names_keep_their_inner_capitals() {
    let (store, tickets) = setup();

    let sold_to = tickets.sell(32, "  ronald ", "McDonald", "adm").await.unwrap();
    assert_eq!(sold_to.first_name, "Ronald");
    assert_eq!(sold_to.last_name, "McDonald");
    assert_eq!(store.get_ticket(32).unwrap().last_name.as_deref(), Some("McDonald"));
}

#[tokio::test]
async fn door_sale_lets_the_ticket_in_and_reset_undoes_it() {
    let (store, tickets) = setup();

    let err = tickets.set_entered(30).await.unwrap_err();
    assert!(matches!(err, TicketError::Precondition(Refusal::Unsold)));
    assert!(store.get_ticket(30).unwrap().entered.is_none());

    let sold_to = tickets.sell(30, "han", "solo", "adm").await.unwrap();
    assert_eq!(sold_to.first_name, "Han");
    assert_eq!(sold_to.last_name, "Solo");
    assert_eq!(tickets.classify(30).await.unwrap(), TicketState::SoldEntered);

    let ticket = store.get_ticket(30).unwrap();
    assert_eq!(ticket.vendor.as_deref(), Some("adm"));
    assert_eq!(ticket.resp_vendor, "Entrance");

    let err = tickets.sell(30, "Han", "Solo", "adm").await.unwrap_err();
    assert!(matches!(
        err,
        TicketError::Precondition(Refusal::AlreadySold { entered: true })
    ));

    tickets.reset(30).await.unwrap();
    assert_eq!(tickets.classify(30).await.unwrap(), TicketState::Unsold);
    assert_eq!(store.get_ticket(30).unwrap(), Ticket::unsold(30, 10));
}

#[tokio::test]
async fn out_of_range_numbers_never_reach_the_store() {
    let (_store, tickets) = setup();

    for num in [-1_i64, 1051, 1500, i64::from(i32::MAX) + 1] {
        assert!(matches!(tickets.classify(num).await, Err(TicketError::NotFound(n)) if n == num));
        assert!(matches!(tickets.set_entered(num).await, Err(TicketError::NotFound(_))));
        assert!(matches!(tickets.rollback_entrance(num).await, Err(TicketError::NotFound(_))));
        assert!(matches!(tickets.sell(num, "Han", "Solo", "adm").await, Err(TicketError::NotFound(_))));
        assert!(matches!(tickets.reset(num).await, Err(TicketError::NotFound(_))));
    }
    assert!(tickets.classify(TICKET_MAX.into()).await.is_ok());
    assert!(tickets.classify(0).await.is_ok());
}

#[tokio::test]
async fn blank_attendee_names_are_refused() {
    let (store, tickets) = setup();

    for (first, last) in [("", "Solo"), ("Han", "   "), ("", "")] {
        let err = tickets.sell(40, first, last, "adm").await.unwrap_err();
        assert!(matches!(err, TicketError::MissingAttendee { .. }));
    }
    assert_eq!(store.get_ticket(40).unwrap(), Ticket::unsold(40, 10));
}

#[tokio::test]
async fn unsold_ticket_with_entry_time_is_unsold() {
    let (store, tickets) = setup();
    let mut odd = Ticket::unsold(50, 10);
    odd.entered = Some(Utc::now());
    store.put_ticket(odd);

    assert_eq!(tickets.classify(50).await.unwrap(), TicketState::Unsold);
    let err = tickets.set_entered(50).await.unwrap_err();
    assert!(matches!(err, TicketError::Precondition(Refusal::Unsold)));
}

#[tokio::test]
async fn stats_count_inside_sold_and_paying() {
    let (store, tickets) = setup();
    let mut free = Ticket::unsold(0, 0);
    free.sold = true;
    free.entered = Some(Utc::now());
    store.put_ticket(free);

    tickets.set_entered(125).await.unwrap();
    let first: String = FirstName().fake();
    let last: String = LastName().fake();
    tickets.sell(31, &first, &last, "adm").await.unwrap();

    let stats = tickets.stats().await;
    assert_eq!(stats.inside, Some(3));
    assert_eq!(stats.sold, Some(3));
    assert_eq!(stats.paying_entered, Some(2));
    assert!(stats.is_complete());
}

#[tokio::test]
async fn failed_counter_does_not_hide_the_others() {
    let (store, tickets) = setup();
    store.fail_count(Stat::PayingEntered);

    let stats = tickets.stats().await;
    assert_eq!(stats.inside, Some(0));
    assert_eq!(stats.sold, Some(1));
    assert_eq!(stats.paying_entered, None);
    assert!(!stats.is_complete());
}

#[tokio::test]
async fn concurrent_entrances_let_exactly_one_through() {
    let (_store, tickets) = setup();

    let attempts = (0..8).map(|_| {
        let tickets = tickets.clone();
        tokio::spawn(async move { tickets.set_entered(125).await })
    });
    let results = futures::future::join_all(attempts).await;

    let admitted = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(Result::is_ok)
        .count();
    assert_eq!(admitted, 1);
    assert_eq!(tickets.classify(125).await.unwrap(), TicketState::SoldEntered);
}

/// Answers every call, but only after `delay`.
struct SlowStore {
    inner: MemoryTicketStore,
    delay: Duration,
}

impl SlowStore {
    async fn stall(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

#[async_trait]
impl TicketStore for SlowStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.stall().await;
        self.inner.ping().await
    }

    async fn sold_entered(
        &self,
        ticket_num: i32,
    ) -> Result<Option<(bool, Option<DateTime<Utc>>)>, StoreError> {
        self.stall().await;
        self.inner.sold_entered(ticket_num).await
    }

    async fn when_entered(
        &self,
        ticket_num: i32,
    ) -> Result<Option<Option<DateTime<Utc>>>, StoreError> {
        self.stall().await;
        self.inner.when_entered(ticket_num).await
    }

    async fn ticket(&self, ticket_num: i32) -> Result<Option<Ticket>, StoreError> {
        self.stall().await;
        self.inner.ticket(ticket_num).await
    }

    async fn tickets(&self) -> Result<Vec<TicketSummary>, StoreError> {
        self.stall().await;
        self.inner.tickets().await
    }

    async fn vendor(&self, ticket_num: i32) -> Result<Option<Option<String>>, StoreError> {
        self.stall().await;
        self.inner.vendor(ticket_num).await
    }

    async fn mark_entered(&self, ticket_num: i32) -> Result<u64, StoreError> {
        self.stall().await;
        self.inner.mark_entered(ticket_num).await
    }

    async fn clear_entrance(&self, ticket_num: i32) -> Result<u64, StoreError> {
        self.stall().await;
        self.inner.clear_entrance(ticket_num).await
    }

    async fn sell(
        &self,
        ticket_num: i32,
        first_name: &str,
        last_name: &str,
        vendor: &str,
    ) -> Result<u64, StoreError> {
        self.stall().await;
        self.inner.sell(ticket_num, first_name, last_name, vendor).await
    }

    async fn reset(&self, ticket_num: i32) -> Result<u64, StoreError> {
        self.stall().await;
        self.inner.reset(ticket_num).await
    }

    async fn count(&self, stat: Stat) -> Result<i64, StoreError> {
        self.stall().await;
        self.inner.count(stat).await
    }

    async fn staff(&self, username: &str) -> Result<Option<Staff>, StoreError> {
        self.stall().await;
        self.inner.staff(username).await
    }
}

#[tokio::test]
async fn stalled_store_is_reported_unavailable() {
    let store = Arc::new(SlowStore {
        inner: MemoryTicketStore::seeded(200, 10),
        delay: Duration::from_secs(5),
    });
    let deadline = Duration::from_millis(50);
    let tickets = TicketService::new(store, 200, deadline);

    let err = tickets.classify(125).await.unwrap_err();
    assert!(matches!(
        err,
        TicketError::StoreUnavailable(StoreError::Timeout(d)) if d == deadline
    ));
    assert!(matches!(
        tickets.set_entered(125).await,
        Err(TicketError::StoreUnavailable(_))
    ));

    let stats = tickets.stats().await;
    assert_eq!(stats, TicketStats::default());
}
