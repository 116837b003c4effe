use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{PoisonError, RwLock},
};

use super::{Stat, StoreError, TicketStore};
use crate::models::{
    ticket::{ENTRANCE_VENDOR, GENERATOR_VENDOR},
    Staff, Ticket, TicketSummary,
};
use crate::services::auth::hash_password;

/// In-process ticket table with the same guarded-update semantics as the
/// PostgreSQL statements. Used by tests and local demos.
#[derive(Default)]
pub struct MemoryTicketStore {
    tickets: RwLock<BTreeMap<i32, Ticket>>,
    staff: RwLock<HashMap<String, Staff>>,
    failing: RwLock<HashSet<Stat>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unsold paid tickets `0..=ticket_max`, all of the given type.
    pub fn seeded(ticket_max: i32, ticket_type: i32) -> Self {
        let store = Self::new();
        {
            let mut tickets = store.tickets.write().unwrap_or_else(PoisonError::into_inner);
            for num in 0..=ticket_max {
                tickets.insert(num, Ticket::unsold(num, ticket_type));
            }
        }
        store
    }

    pub fn put_ticket(&self, ticket: Ticket) {
        self.tickets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ticket.ticket_num, ticket);
    }

    pub fn get_ticket(&self, ticket_num: i32) -> Option<Ticket> {
        self.tickets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ticket_num)
            .cloned()
    }

    /// Registers a staff member with a clear-text password.
    pub fn put_staff(&self, username: &str, password: &str, admin: bool) {
        let staff = Staff {
            username: username.to_string(),
            password: hash_password(password),
            admin,
        };
        self.staff
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(staff.username.clone(), staff);
    }

    /// Makes every later `count(stat)` fail.
    pub fn fail_count(&self, stat: Stat) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(stat);
    }

    fn read<T>(&self, ticket_num: i32, f: impl FnOnce(&Ticket) -> T) -> Option<T> {
        self.tickets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ticket_num)
            .map(f)
    }

    fn update_where(
        &self,
        ticket_num: i32,
        guard: impl FnOnce(&Ticket) -> bool,
        apply: impl FnOnce(&mut Ticket),
    ) -> u64 {
        let mut tickets = self.tickets.write().unwrap_or_else(PoisonError::into_inner);
        match tickets.get_mut(&ticket_num) {
            Some(ticket) if guard(ticket) => {
                apply(ticket);
                1
            }
            _ => 0,
        }
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn sold_entered(
        &self,
        ticket_num: i32,
    ) -> Result<Option<(bool, Option<DateTime<Utc>>)>, StoreError> {
        Ok(self.read(ticket_num, |t| (t.sold, t.entered)))
    }

    async fn when_entered(
        &self,
        ticket_num: i32,
    ) -> Result<Option<Option<DateTime<Utc>>>, StoreError> {
        Ok(self.read(ticket_num, |t| t.entered))
    }

    async fn ticket(&self, ticket_num: i32) -> Result<Option<Ticket>, StoreError> {
        Ok(self.get_ticket(ticket_num))
    }

    async fn tickets(&self) -> Result<Vec<TicketSummary>, StoreError> {
        let tickets = self.tickets.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tickets.values().map(TicketSummary::from).collect())
    }

    async fn vendor(&self, ticket_num: i32) -> Result<Option<Option<String>>, StoreError> {
        Ok(self.read(ticket_num, |t| t.vendor.clone()))
    }

    async fn mark_entered(&self, ticket_num: i32) -> Result<u64, StoreError> {
        Ok(self.update_where(
            ticket_num,
            |t| t.sold && t.entered.is_none(),
            |t| t.entered = Some(Utc::now()),
        ))
    }

    async fn clear_entrance(&self, ticket_num: i32) -> Result<u64, StoreError> {
        Ok(self.update_where(ticket_num, |t| t.entered.is_some(), |t| t.entered = None))
    }

    async fn sell(
        &self,
        ticket_num: i32,
        first_name: &str,
        last_name: &str,
        vendor: &str,
    ) -> Result<u64, StoreError> {
        Ok(self.update_where(
            ticket_num,
            |t| !t.sold && t.first_name.is_none(),
            |t| {
                t.first_name = Some(first_name.to_string());
                t.last_name = Some(last_name.to_string());
                t.sold = true;
                t.vendor = Some(vendor.to_string());
                t.resp_vendor = ENTRANCE_VENDOR.to_string();
                t.entered = Some(Utc::now());
            },
        ))
    }

    async fn reset(&self, ticket_num: i32) -> Result<u64, StoreError> {
        Ok(self.update_where(
            ticket_num,
            |_| true,
            |t| {
                t.first_name = None;
                t.last_name = None;
                t.sold = false;
                t.vendor = None;
                t.resp_vendor = GENERATOR_VENDOR.to_string();
                t.entered = None;
            },
        ))
    }

    async fn count(&self, stat: Stat) -> Result<i64, StoreError> {
        if self
            .failing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&stat)
        {
            return Err(StoreError::Unavailable(format!("{stat:?} count failed")));
        }

        let tickets = self.tickets.read().unwrap_or_else(PoisonError::into_inner);
        let count = tickets
            .values()
            .filter(|t| match stat {
                Stat::Inside => t.entered.is_some(),
                Stat::Sold => t.sold,
                Stat::PayingEntered => t.entered.is_some() && t.sold && t.is_paying(),
            })
            .count();
        Ok(count as i64)
    }

    async fn staff(&self, username: &str) -> Result<Option<Staff>, StoreError> {
        Ok(self
            .staff
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guarded_updates_touch_nothing_when_the_guard_fails() {
        let store = MemoryTicketStore::seeded(5, 10);

        // unsold: cannot be stamped
        assert_eq!(store.mark_entered(2).await.unwrap(), 0);
        // not inside: nothing to clear
        assert_eq!(store.clear_entrance(2).await.unwrap(), 0);

        assert_eq!(store.sell(2, "Han", "Solo", "adm").await.unwrap(), 1);
        assert_eq!(store.sell(2, "Leia", "Organa", "adm").await.unwrap(), 0);

        let ticket = store.get_ticket(2).unwrap();
        assert_eq!(ticket.first_name.as_deref(), Some("Han"));
        assert_eq!(ticket.resp_vendor, ENTRANCE_VENDOR);
        assert!(ticket.entered.is_some());
    }

    #[tokio::test]
    async fn missing_rows_read_as_none() {
        let store = MemoryTicketStore::seeded(5, 10);
        assert!(store.sold_entered(6).await.unwrap().is_none());
        assert!(store.when_entered(6).await.unwrap().is_none());
        assert_eq!(store.reset(6).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn counters_follow_the_rows() {
        let store = MemoryTicketStore::seeded(3, 10);
        let mut free = Ticket::unsold(0, 0);
        free.sold = true;
        free.entered = Some(Utc::now());
        store.put_ticket(free);
        store.sell(1, "Han", "Solo", "adm").await.unwrap();

        assert_eq!(store.count(Stat::Inside).await.unwrap(), 2);
        assert_eq!(store.count(Stat::Sold).await.unwrap(), 2);
        assert_eq!(store.count(Stat::PayingEntered).await.unwrap(), 1);

        store.fail_count(Stat::Sold);
        assert!(store.count(Stat::Sold).await.is_err());
    }
}
