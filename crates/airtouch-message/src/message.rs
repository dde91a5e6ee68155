use crate::messages::{AcErrorInformation, ConsoleVersion, GroupNames, ZoneStatus};

/// Every message the stack knows how to decode or encode.
///
/// Each variant wraps a family type that is itself a sum of the family's
/// request and report forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ZoneStatus(ZoneStatus),
    AcErrorInformation(AcErrorInformation),
    GroupNames(GroupNames),
    ConsoleVersion(ConsoleVersion),
}

/// Field-less discriminant of [`Message`], used for subscriptions and
/// registry lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    ZoneStatus,
    AcErrorInformation,
    GroupNames,
    ConsoleVersion,
}

impl MessageKind {
    pub const ALL: [MessageKind; 4] = [
        MessageKind::ZoneStatus,
        MessageKind::AcErrorInformation,
        MessageKind::GroupNames,
        MessageKind::ConsoleVersion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::ZoneStatus => "zone-status",
            MessageKind::AcErrorInformation => "ac-error-information",
            MessageKind::GroupNames => "group-names",
            MessageKind::ConsoleVersion => "console-version",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::ZoneStatus(_) => MessageKind::ZoneStatus,
            Message::AcErrorInformation(_) => MessageKind::AcErrorInformation,
            Message::GroupNames(_) => MessageKind::GroupNames,
            Message::ConsoleVersion(_) => MessageKind::ConsoleVersion,
        }
    }

    /// Whether this is a request form rather than a console report.
    pub fn is_request(&self) -> bool {
        match self {
            Message::ZoneStatus(m) => matches!(m, ZoneStatus::Request),
            Message::AcErrorInformation(m) => matches!(m, AcErrorInformation::Request { .. }),
            Message::GroupNames(m) => matches!(m, GroupNames::Request(_)),
            Message::ConsoleVersion(m) => matches!(m, ConsoleVersion::Request),
        }
    }

    /// The keep-alive request sent to both console generations.
    pub fn heartbeat() -> Message {
        Message::ConsoleVersion(ConsoleVersion::Request)
    }
}

/// A family type that lives inside one [`Message`] variant.
pub trait Variant: Sized + Send + Sync + 'static {
    const KIND: MessageKind;

    fn into_message(self) -> Message;

    fn from_message(message: &Message) -> Option<&Self>;
}

macro_rules! impl_variant {
    ($($name:ident),+ $(,)?) => {
        $(
            impl Variant for $name {
                const KIND: MessageKind = MessageKind::$name;

                fn into_message(self) -> Message {
                    Message::$name(self)
                }

                fn from_message(message: &Message) -> Option<&Self> {
                    match message {
                        Message::$name(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$name> for Message {
                fn from(value: $name) -> Self {
                    Message::$name(value)
                }
            }
        )+
    };
}

impl_variant!(ZoneStatus, AcErrorInformation, GroupNames, ConsoleVersion);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let message: Message = ZoneStatus::Request.into();
        assert_eq!(message.kind(), MessageKind::ZoneStatus);
        assert_eq!(<ZoneStatus as Variant>::KIND, MessageKind::ZoneStatus);
        assert!(ZoneStatus::from_message(&message).is_some());
        assert!(GroupNames::from_message(&message).is_none());
    }

    #[test]
    fn heartbeat_is_console_version_request() {
        let heartbeat = Message::heartbeat();
        assert_eq!(heartbeat.kind(), MessageKind::ConsoleVersion);
        assert!(heartbeat.is_request());
    }

    #[test]
    fn kind_names_are_distinct() {
        let mut names: Vec<_> = MessageKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MessageKind::ALL.len());
    }
}
