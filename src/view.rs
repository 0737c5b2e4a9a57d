//! Account dashboard view model
//!
//! Everything here is derived client-side from the raw `/account` list:
//! link status, the summary cards, filtering and sorting. The local
//! `LinkBook` keeps the last authoritative list together with tentative
//! patches made after invalidate/extend until the next fetch replaces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;

use crate::model::{ExtendResponse, ShortLink};

/// Smallest and largest number of days one extension may add
pub const MIN_EXTEND_DAYS: u32 = 1;
pub const MAX_EXTEND_DAYS: u32 = 7;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Expired,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClickSort {
    /// Newest first
    #[default]
    None,
    Asc,
    Desc,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Active,
    Expired,
}

/// A link is expired once deactivated or once its expiration has passed.
pub fn is_expired(link: &ShortLink, now: DateTime<Utc>) -> bool {
    if !link.active {
        return true;
    }
    link.expiration.is_some_and(|exp| exp <= now)
}

pub fn status_of(link: &ShortLink, now: DateTime<Utc>) -> LinkStatus {
    if is_expired(link, now) {
        LinkStatus::Expired
    } else {
        LinkStatus::Active
    }
}

pub fn extensions_left(link: &ShortLink) -> u32 {
    link.maximum_extensions.saturating_sub(link.extensions)
}

/// Summary cards, always computed over the unfiltered list
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LinkStats {
    pub total_links: usize,
    pub total_clicks: u64,
    pub active_count: usize,
    pub expired_count: usize,
}

pub fn compute_stats(links: &[ShortLink], now: DateTime<Utc>) -> LinkStats {
    let expired_count = links.iter().filter(|l| is_expired(l, now)).count();
    LinkStats {
        total_links: links.len(),
        total_clicks: links.iter().map(|l| l.clicks_count).sum(),
        active_count: links.len() - expired_count,
        expired_count,
    }
}

fn newest_first(a: &ShortLink, b: &ShortLink) -> Ordering {
    // `None` sorts below any timestamp, so undated links land last.
    b.created_at.cmp(&a.created_at)
}

/// Filters then sorts. Ties on click count fall back to newest first.
pub fn filter_and_sort(
    links: &[ShortLink],
    status: StatusFilter,
    sort: ClickSort,
    now: DateTime<Utc>,
) -> Vec<ShortLink> {
    let mut visible: Vec<ShortLink> = links
        .iter()
        .filter(|l| match status {
            StatusFilter::All => true,
            StatusFilter::Active => !is_expired(l, now),
            StatusFilter::Expired => is_expired(l, now),
        })
        .cloned()
        .collect();

    match sort {
        ClickSort::None => visible.sort_by(newest_first),
        ClickSort::Asc => visible.sort_by(|a, b| {
            a.clicks_count
                .cmp(&b.clicks_count)
                .then_with(|| newest_first(a, b))
        }),
        ClickSort::Desc => visible.sort_by(|a, b| {
            Reverse(a.clicks_count)
                .cmp(&Reverse(b.clicks_count))
                .then_with(|| newest_first(a, b))
        }),
    }
    visible
}

/// One row of the dashboard list
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LinkItem {
    #[serde(flatten)]
    pub link: ShortLink,
    pub status: LinkStatus,
    /// Full short link to open or copy, `<backend>/r/<code>`
    pub short_link: String,
    pub extensions_left: u32,
    pub can_extend: bool,
    /// The row still carries a local patch the API has not re-confirmed
    pub pending: bool,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub links: Vec<LinkItem>,
    pub stats: LinkStats,
    pub status: StatusFilter,
    pub sort: ClickSort,
}

/// Visible rows plus stats for the given filter and sort
pub fn derive_view(
    links: &[ShortLink],
    status: StatusFilter,
    sort: ClickSort,
    now: DateTime<Utc>,
) -> (Vec<ShortLink>, LinkStats) {
    (
        filter_and_sort(links, status, sort, now),
        compute_stats(links, now),
    )
}

/// Why an extension was refused before reaching the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendRefusal {
    DaysOutOfRange,
    QuotaExhausted,
    AlreadyExpired,
}

impl ExtendRefusal {
    pub fn message(&self) -> &'static str {
        match self {
            ExtendRefusal::DaysOutOfRange => "Extension must be between 1 and 7 days.",
            ExtendRefusal::QuotaExhausted => "No extensions left for this link.",
            ExtendRefusal::AlreadyExpired => "Cannot extend an expired link.",
        }
    }
}

pub fn check_extension(
    link: &ShortLink,
    days: u32,
    now: DateTime<Utc>,
) -> Result<(), ExtendRefusal> {
    if !(MIN_EXTEND_DAYS..=MAX_EXTEND_DAYS).contains(&days) {
        return Err(ExtendRefusal::DaysOutOfRange);
    }
    if extensions_left(link) == 0 {
        return Err(ExtendRefusal::QuotaExhausted);
    }
    if is_expired(link, now) {
        return Err(ExtendRefusal::AlreadyExpired);
    }
    Ok(())
}

/// Scope of one `/account` request; only the latest may land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// Local copy of the account's links
#[derive(Debug, Default)]
pub struct LinkBook {
    links: Vec<ShortLink>,
    pending: HashSet<i64>,
    generation: u64,
    loaded: bool,
}

impl LinkBook {
    pub fn links(&self) -> &[ShortLink] {
        &self.links
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_pending(&self, id: i64) -> bool {
        self.pending.contains(&id)
    }

    pub fn get(&self, id: i64) -> Option<&ShortLink> {
        self.links.iter().find(|l| l.id == id)
    }

    /// Starts a new fetch, superseding any in flight.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket(self.generation)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Replaces the list with an authoritative response. Returns `false`
    /// and changes nothing when the ticket was superseded, cancelled, or
    /// issued before a local patch.
    pub fn commit(&mut self, ticket: FetchTicket, links: Vec<ShortLink>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.links = links;
        self.pending.clear();
        self.loaded = true;
        true
    }

    /// Drops outstanding tickets and forgets the list.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.links.clear();
        self.pending.clear();
        self.loaded = false;
    }

    /// Tentative local patch after a confirmed invalidate call.
    ///
    /// A fetch that started before the patch may carry the old row, so its
    /// ticket is retired here.
    pub fn mark_invalidated(&mut self, id: i64, now: DateTime<Utc>) -> bool {
        let Some(link) = self.links.iter_mut().find(|l| l.id == id) else {
            return false;
        };
        link.active = false;
        link.expiration = Some(now);
        self.pending.insert(id);
        self.generation += 1;
        true
    }

    /// Applies the server's answer to an extend call. The values come from
    /// the API, so the row is not flagged pending.
    pub fn apply_extension(&mut self, id: i64, response: &ExtendResponse) -> bool {
        let Some(link) = self.links.iter_mut().find(|l| l.id == id) else {
            return false;
        };
        if let Some(expiration) = response.expiration {
            link.expiration = Some(expiration);
        }
        if let Some(extensions) = response.extensions {
            link.extensions = extensions;
        }
        if let Some(maximum) = response.maximum_extensions {
            link.maximum_extensions = maximum;
        }
        self.generation += 1;
        true
    }

    /// Dashboard payload for the current list
    pub fn view(
        &self,
        status: StatusFilter,
        sort: ClickSort,
        now: DateTime<Utc>,
        short_link_for: impl Fn(&ShortLink) -> String,
    ) -> DashboardView {
        let (visible, stats) = derive_view(&self.links, status, sort, now);
        let links = visible
            .into_iter()
            .map(|link| {
                let left = extensions_left(&link);
                let expired = is_expired(&link, now);
                LinkItem {
                    status: status_of(&link, now),
                    short_link: short_link_for(&link),
                    extensions_left: left,
                    can_extend: !expired && left > 0,
                    pending: self.is_pending(link.id),
                    link,
                }
            })
            .collect();

        DashboardView {
            links,
            stats,
            status,
            sort,
        }
    }
}
