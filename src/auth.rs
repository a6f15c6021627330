use crate::platform::ChatIdentifier;

/// Chat identifiers permitted to use the relay.
///
/// Entries are kept as trimmed strings; blank entries are dropped on
/// construction. Duplicates are harmless.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    /// Parse free text in the admin form, e.g. `"42, -1001234 ,@news"`.
    pub fn parse(text: &str) -> Self {
        Self::from_entries([text])
    }

    /// Build from configured items. Each item may itself hold comma-separated ids.
    pub fn from_entries<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = items
            .into_iter()
            .flat_map(|item| {
                item.as_ref()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Every entry as a chat the relay may send to.
    pub fn chats(&self) -> Vec<ChatIdentifier> {
        self.entries.iter().map(|e| ChatIdentifier::parse(e)).collect()
    }
}

/// Exact string match of the chat id against the allow-list.
pub fn is_authorized(chat_id: &ChatIdentifier, allow_list: &AllowList) -> bool {
    let candidate = chat_id.to_string();
    allow_list.entries.iter().any(|entry| *entry == candidate)
}
