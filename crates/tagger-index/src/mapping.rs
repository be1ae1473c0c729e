use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use crate::matcher;
use crate::store::{Error, Store, StoreExt};

/// Store key holding the serialized mapping.
pub const MAPPING_KEY: &str = "mapping";

static EMPTY: BTreeSet<String> = BTreeSet::new();

/// How tags are normalized before they are stored or looked up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFolding {
    /// Tags are lower-cased.
    #[default]
    Insensitive,
    /// Tags are kept exactly as typed.
    Sensitive,
}

impl CaseFolding {
    #[must_use]
    pub fn normalize(self, tag: &str) -> Cow<'_, str> {
        match self {
            Self::Insensitive => Cow::Owned(tag.to_lowercase()),
            Self::Sensitive => Cow::Borrowed(tag),
        }
    }
}

/// Which side of the index [`TagMapping::find`] looks up.
#[derive(Debug, Clone, Copy)]
pub enum Selector<'a> {
    /// Users carrying this tag.
    Tag(&'a str),
    /// Tags carried by this user.
    User(&'a str),
}

/// Best known tag for a query, see [`TagMapping::nearest`].
#[derive(Debug, Clone, PartialEq)]
pub struct Nearest {
    pub tag: String,
    pub ratio: f64,
}

/// Bidirectional index between tags and users.
///
/// `u ∈ tags[t]` holds exactly when `t ∈ users[u]`. Entries whose set becomes
/// empty are pruned, so the in-memory state always equals what
/// [`dump`](Self::dump) would persist.
#[derive(Debug, Clone, Default)]
pub struct TagMapping {
    tags: BTreeMap<String, BTreeSet<String>>,
    users: BTreeMap<String, BTreeSet<String>>,
    dirty: bool,
    folding: CaseFolding,
}

impl TagMapping {
    #[must_use]
    pub fn new(folding: CaseFolding) -> Self {
        Self {
            folding,
            ..Self::default()
        }
    }

    /// Load from `storage`, run `op`, and store the result if `op` succeeded.
    ///
    /// A failing `op` leaves the persisted mapping untouched, even if it had
    /// already mutated the in-memory copy.
    pub fn scoped<S, T, F>(storage: &S, folding: CaseFolding, op: F) -> exn::Result<T, Error>
    where
        S: Store + ?Sized,
        F: FnOnce(&mut Self) -> exn::Result<T, Error>,
    {
        let mut mapping = Self::new(folding);
        mapping.load(storage)?;
        let value = op(&mut mapping)?;
        mapping.store(storage)?;
        Ok(value)
    }

    #[must_use]
    pub const fn folding(&self) -> CaseFolding {
        self.folding
    }

    /// Whether there are mutations that have not been stored yet.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Tag `user` with every tag in `tags`.
    pub fn add<I>(&mut self, user: &str, tags: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.dirty = true;
        for tag in tags {
            let tag = self.folding.normalize(tag.as_ref()).into_owned();
            self.tags
                .entry(tag.clone())
                .or_default()
                .insert(user.to_owned());
            self.users.entry(user.to_owned()).or_default().insert(tag);
        }
    }

    /// Untag `user` from every tag in `tags`. Absent pairs are ignored.
    pub fn remove<I>(&mut self, user: &str, tags: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.dirty = true;
        for tag in tags {
            let tag = self.folding.normalize(tag.as_ref());
            let tag = tag.as_ref();
            if let Some(users) = self.tags.get_mut(tag) {
                users.remove(user);
                if users.is_empty() {
                    self.tags.remove(tag);
                }
            }
            if let Some(tags) = self.users.get_mut(user) {
                tags.remove(tag);
                if tags.is_empty() {
                    self.users.remove(user);
                }
            }
        }
    }

    /// Users for a tag or tags for a user. Unknown keys give an empty set.
    #[must_use]
    pub fn find(&self, selector: Selector<'_>) -> &BTreeSet<String> {
        let found = match selector {
            Selector::Tag(tag) => self.tags.get(self.folding.normalize(tag).as_ref()),
            Selector::User(user) => self.users.get(user),
        };
        found.unwrap_or(&EMPTY)
    }

    /// Whether at least one user carries `tag`.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(self.folding.normalize(tag).as_ref())
    }

    /// Known tags in lexicographic order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// The known tag most similar to `tag`, or `None` when no tag is known.
    ///
    /// Equal scores resolve to the lexicographically smallest tag.
    #[must_use]
    pub fn nearest(&self, tag: &str) -> Option<Nearest> {
        let mut best: Option<Nearest> = None;
        for known in self.tags() {
            let ratio = matcher::ratio(known, tag);
            if best.as_ref().is_none_or(|b| ratio > b.ratio) {
                best = Some(Nearest {
                    tag: known.to_owned(),
                    ratio,
                });
            }
        }
        best
    }

    /// Serialized form: every tag with at least one user.
    #[must_use]
    pub fn dump(&self) -> BTreeMap<String, Vec<String>> {
        self.tags
            .iter()
            .filter(|(_, users)| !users.is_empty())
            .map(|(tag, users)| (tag.clone(), users.iter().cloned().collect()))
            .collect()
    }

    /// Replace both indices with the mapping persisted in `storage`.
    pub fn load<S: Store + ?Sized>(&mut self, storage: &S) -> exn::Result<&mut Self, Error> {
        let persisted: BTreeMap<String, Vec<String>> =
            storage.get_or(MAPPING_KEY, BTreeMap::new())?;
        self.tags.clear();
        self.users.clear();
        for (tag, users) in persisted {
            let tag = self.folding.normalize(&tag).into_owned();
            for user in users {
                self.tags
                    .entry(tag.clone())
                    .or_default()
                    .insert(user.clone());
                self.users.entry(user).or_default().insert(tag.clone());
            }
        }
        self.dirty = false;
        tracing::debug!(
            tags = self.tags.len(),
            users = self.users.len(),
            "mapping loaded"
        );
        Ok(self)
    }

    /// Persist to `storage` if anything changed since the last load.
    pub fn store<S: Store + ?Sized>(&mut self, storage: &S) -> exn::Result<&mut Self, Error> {
        if self.dirty {
            storage.put_as(MAPPING_KEY, &self.dump())?;
            self.dirty = false;
            tracing::debug!(tags = self.tags.len(), "mapping stored");
        }
        Ok(self)
    }
}
