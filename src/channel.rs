//! Channel store
//!
//! Named, independent message logs. Channels are created explicitly and
//! bounded in number by `max_channels`.

use std::collections::{HashMap, VecDeque};

use crate::error::ChatError;

/// A message in a channel log, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender's display name at the time of sending
    pub sender: String,
    pub body: String,
}

impl Message {
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
        }
    }
}

/// A named message log
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    messages: VecDeque<Message>,
    /// Oldest messages are evicted beyond this length (None = unbounded)
    history_limit: Option<usize>,
}

impl Channel {
    fn new(name: String, history_limit: Option<usize>) -> Self {
        Self {
            name,
            messages: VecDeque::new(),
            history_limit,
        }
    }

    fn push(&mut self, message: Message) -> usize {
        self.messages.push_back(message);
        if let Some(limit) = self.history_limit {
            while self.messages.len() > limit {
                self.messages.pop_front();
            }
        }
        self.messages.len()
    }

    /// Messages in append order
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Store of all channels
#[derive(Debug)]
pub struct ChannelStore {
    channels: HashMap<String, Channel>,
    max_channels: usize,
    history_limit: Option<usize>,
}

impl ChannelStore {
    pub fn new(max_channels: usize, history_limit: Option<usize>) -> Self {
        Self {
            channels: HashMap::new(),
            max_channels,
            history_limit,
        }
    }

    /// Create an empty channel
    pub fn add(&mut self, name: &str) -> Result<(), ChatError> {
        if self.channels.len() >= self.max_channels {
            return Err(ChatError::TooManyChannels);
        }
        if self.channels.contains_key(name) {
            return Err(ChatError::ChannelExists(name.to_string()));
        }

        self.channels.insert(
            name.to_string(),
            Channel::new(name.to_string(), self.history_limit),
        );
        Ok(())
    }

    /// Append a message, returning the channel's new length
    pub fn append(&mut self, name: &str, message: Message) -> Result<usize, ChatError> {
        let channel = self
            .channels
            .get_mut(name)
            .ok_or_else(|| ChatError::ChannelNotFound(name.to_string()))?;
        Ok(channel.push(message))
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Channel names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_channel_starts_empty() {
        let mut store = ChannelStore::new(10, None);

        store.add("main").unwrap();

        let channel = store.get("main").unwrap();
        assert_eq!(channel.name, "main");
        assert!(channel.is_empty());
    }

    #[test]
    fn test_add_channel_twice() {
        let mut store = ChannelStore::new(10, None);
        store.add("main").unwrap();
        store.append("main", Message::new("Alice", "hi")).unwrap();

        assert_eq!(
            store.add("main"),
            Err(ChatError::ChannelExists("main".to_string()))
        );
        assert_eq!(store.get("main").unwrap().len(), 1);
    }

    #[test]
    fn test_channel_capacity() {
        let mut store = ChannelStore::new(2, None);
        store.add("main").unwrap();
        store.add("off-topic").unwrap();

        assert_eq!(store.add("new-members"), Err(ChatError::TooManyChannels));
        // Capacity is checked before uniqueness
        assert_eq!(store.add("main"), Err(ChatError::TooManyChannels));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_append_grows_log_in_order() {
        let mut store = ChannelStore::new(10, None);
        store.add("main").unwrap();

        assert_eq!(store.append("main", Message::new("Alice", "one")).unwrap(), 1);
        assert_eq!(store.append("main", Message::new("Bob", "two")).unwrap(), 2);

        let bodies: Vec<_> = store
            .get("main")
            .unwrap()
            .messages()
            .map(|m| m.body.as_str())
            .collect();
        assert_eq!(bodies, vec!["one", "two"]);
    }

    #[test]
    fn test_append_missing_channel() {
        let mut store = ChannelStore::new(10, None);
        store.add("main").unwrap();

        let result = store.append("missing", Message::new("Alice", "hi"));

        assert_eq!(result, Err(ChatError::ChannelNotFound("missing".to_string())));
        assert!(store.get("main").unwrap().is_empty());
        assert!(!store.contains("missing"));
    }

    #[test]
    fn test_history_limit_evicts_oldest() {
        let mut store = ChannelStore::new(10, Some(2));
        store.add("main").unwrap();

        store.append("main", Message::new("Alice", "one")).unwrap();
        store.append("main", Message::new("Alice", "two")).unwrap();
        let len = store.append("main", Message::new("Alice", "three")).unwrap();

        assert_eq!(len, 2);
        let first = store.get("main").unwrap().messages().next().unwrap();
        assert_eq!(first.body, "two");
    }

    #[test]
    fn test_names_sorted() {
        let mut store = ChannelStore::new(10, None);
        store.add("off-topic").unwrap();
        store.add("main").unwrap();

        assert_eq!(store.names(), vec!["main".to_string(), "off-topic".to_string()]);
    }
}
