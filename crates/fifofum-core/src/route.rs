//! Per-pipe line routing.
//!
//! Data flow for one assembled line:
//! ```text
//! line → classify → Directive   → update active channel, emit nothing
//!                 → PlainText   → skip-first-line guard / passthrough, then emit
//!                 → DataPayload → emit (gated on an active channel when multiplexing)
//! ```
//! Precedence matters and is deliberately not a chain of early returns for
//! the text case: a plain line that survives the guard is both eligible for
//! passthrough logging and forwarded as a message.

use crate::channel::sanitize;

/// Control line switching the active channel of a multiplexed pipe.
pub const DIRECTIVE_PREFIX: &str = "channel:";

/// Payload lines (data URLs and raw-image variants) start with this.
pub const DATA_PREFIX: &str = "data:";

/// Routing behavior shared by every pipe of one server instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterConfig {
    /// Honor `channel: NAME` directives and gate lines until one is seen.
    pub multiplex: bool,
    /// Mirror non-payload lines to the passthrough sink.
    pub passthrough: bool,
}

/// Classification of one assembled line by prefix inspection.
///
/// A `channel:` prefix only counts as a directive when multiplexing is
/// enabled; otherwise the line is ordinary text and travels as a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// `channel: NAME` — the raw name, untrimmed and unsanitized.
    Directive(&'a str),
    /// `data:…` payload (image data URL or raw-pixel variant).
    DataPayload,
    /// Anything else: status output, free text.
    PlainText,
}

/// Classify a line under the given multiplex setting.
pub fn classify(line: &str, multiplex: bool) -> LineClass<'_> {
    if multiplex && let Some(name) = line.strip_prefix(DIRECTIVE_PREFIX) {
        return LineClass::Directive(name);
    }
    if line.starts_with(DATA_PREFIX) {
        LineClass::DataPayload
    } else {
        LineClass::PlainText
    }
}

/// Outbound message: channel label plus the original line, verbatim.
///
/// Invariant: `channel` contains no colon (sanitized at every point of entry),
/// so subscribers can split the wire text on the first colon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Logical grouping label shown to subscribers.
    pub channel: String,
    /// The line content, which may itself contain colons.
    pub body: String,
}

impl Message {
    /// Wire encoding delivered to every subscriber.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.channel, self.body)
    }
}

/// What the router decided for one line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Routed {
    /// Message to broadcast, if the line resolved to a channel.
    pub message: Option<Message>,
    /// Whether the line should also be mirrored to the passthrough sink.
    pub passthrough: bool,
}

/// Routing state of a single pipe.
#[derive(Debug)]
pub struct SourceState {
    name: String,
    active_channel: String,
    skip_first_line: bool,
}

impl SourceState {
    /// Create the state for a pipe with an already-sanitized name.
    ///
    /// `skip_first_line` starts true: the first text line after open may be
    /// the tail of something written before we attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active_channel: String::new(),
            skip_first_line: true,
        }
    }

    /// Sanitized pipe name, used as the channel when no directive is active.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Currently active sub-channel; empty when none was set (or it was
    /// unset by an empty directive).
    pub fn active_channel(&self) -> &str {
        &self.active_channel
    }

    /// Arm the skip-first-line guard after a read error or EOF: the next
    /// assembled text line may be a truncated continuation and is dropped.
    pub fn mark_interrupted(&mut self) {
        self.skip_first_line = true;
    }

    /// Route one fully assembled line, in read order.
    pub fn process_line(&mut self, line: &str, config: &RouterConfig) -> Routed {
        let mut routed = Routed::default();

        let class = classify(line, config.multiplex);

        if let LineClass::Directive(name) = class {
            // An empty trimmed name is stored as-is: it unsets multiplexing
            // and routing falls back to the pipe's own name.
            self.active_channel = sanitize(name.trim());
            return routed;
        }

        if class == LineClass::PlainText {
            if self.skip_first_line {
                self.skip_first_line = false;
                return routed;
            }
            routed.passthrough = config.passthrough;
        }

        // A multiplexed pipe must not emit before its first directive:
        // line blocks may be incomplete until the producer frames them.
        if config.multiplex && self.active_channel.is_empty() {
            return routed;
        }

        let channel = if self.active_channel.is_empty() {
            &self.name
        } else {
            &self.active_channel
        };
        routed.message = Some(Message {
            channel: channel.clone(),
            body: line.to_string(),
        });
        routed
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const PLAIN: RouterConfig = RouterConfig {
        multiplex: false,
        passthrough: false,
    };
    const MULTIPLEX: RouterConfig = RouterConfig {
        multiplex: true,
        passthrough: false,
    };
    const PASSTHROUGH: RouterConfig = RouterConfig {
        multiplex: false,
        passthrough: true,
    };

    /// A source whose skip-first-line guard has already been consumed.
    fn settled(name: &str) -> SourceState {
        let mut state = SourceState::new(name);
        let _ = state.process_line("boot noise", &PLAIN);
        state
    }

    #[test]
    fn classify_directive_only_under_multiplex() {
        assert_eq!(classify("channel: foo", true), LineClass::Directive(" foo"));
        assert_eq!(classify("channel: foo", false), LineClass::PlainText);
        assert_eq!(classify("data:image/png;base64,AA", true), LineClass::DataPayload);
        assert_eq!(classify("hello", true), LineClass::PlainText);
    }

    #[test]
    fn directive_sets_sanitized_channel_and_emits_nothing() {
        let mut state = settled("alpha");
        let routed = state.process_line("channel: Foo Bar:Baz", &MULTIPLEX);
        assert_eq!(routed, Routed::default());
        assert_eq!(state.active_channel(), "Foo_Bar_Baz");
    }

    #[test]
    fn multiplexed_data_dropped_until_channel_is_set() {
        let mut state = settled("alpha");
        let routed = state.process_line("data:image/png;base64,AAA", &MULTIPLEX);
        assert_eq!(routed.message, None);
        assert!(!routed.passthrough);

        let _ = state.process_line("channel: plot", &MULTIPLEX);
        let routed = state.process_line("data:image/png;base64,AAA", &MULTIPLEX);
        assert_eq!(
            routed.message,
            Some(Message {
                channel: "plot".into(),
                body: "data:image/png;base64,AAA".into(),
            })
        );
    }

    #[test]
    fn data_line_routes_to_pipe_name_without_multiplex() {
        let mut state = SourceState::new("sensor");
        // Data lines are not subject to the skip-first-line guard.
        let routed = state.process_line("data:image/png;base64,AAA", &PLAIN);
        let message = routed.message.unwrap();
        assert_eq!(message.encode(), "sensor:data:image/png;base64,AAA");
    }

    #[test]
    fn first_text_line_after_open_is_discarded_once() {
        let mut state = SourceState::new("alpha");
        let routed = state.process_line("runcated tail", &PASSTHROUGH);
        assert_eq!(routed, Routed::default());

        let routed = state.process_line("hello", &PASSTHROUGH);
        assert!(routed.passthrough);
        assert_eq!(routed.message.unwrap().encode(), "alpha:hello");
    }

    #[test]
    fn guard_rearms_after_interruption() {
        let mut state = settled("alpha");
        state.mark_interrupted();

        let routed = state.process_line("maybe-truncated", &PLAIN);
        assert_eq!(routed, Routed::default());

        let routed = state.process_line("whole line", &PLAIN);
        assert_eq!(routed.message.unwrap().encode(), "alpha:whole line");
    }

    #[test]
    fn plain_text_is_both_logged_and_forwarded() {
        let mut state = settled("alpha");
        let _ = state.process_line(
            "channel: status",
            &RouterConfig { multiplex: true, passthrough: true },
        );
        let routed = state.process_line(
            "ready",
            &RouterConfig { multiplex: true, passthrough: true },
        );
        assert!(routed.passthrough);
        assert_eq!(routed.message.unwrap().encode(), "status:ready");
    }

    #[test]
    fn unrouted_text_still_reaches_passthrough_under_multiplex() {
        // No channel yet: the message is gated, the log line is not.
        let mut state = settled("alpha");
        let routed = state.process_line(
            "starting up",
            &RouterConfig { multiplex: true, passthrough: true },
        );
        assert!(routed.passthrough);
        assert_eq!(routed.message, None);
    }

    #[test]
    fn empty_directive_unsets_channel_and_falls_back_to_pipe_name() {
        let mut state = settled("alpha");
        let _ = state.process_line("channel: plot", &MULTIPLEX);
        assert_eq!(state.active_channel(), "plot");

        // "channel: \n" stores the empty name; with multiplexing on this
        // re-gates data, and with it off routing uses the pipe name again.
        let _ = state.process_line("channel: ", &MULTIPLEX);
        assert_eq!(state.active_channel(), "");
        let routed = state.process_line("data:image/png;base64,AA", &MULTIPLEX);
        assert_eq!(routed.message, None);
    }

    #[test]
    fn directive_is_plain_text_when_multiplex_disabled() {
        let mut state = settled("alpha");
        let routed = state.process_line("channel: plot", &PLAIN);
        assert_eq!(state.active_channel(), "");
        assert_eq!(routed.message.unwrap().encode(), "alpha:channel: plot");
    }

    #[test]
    fn data_lines_never_hit_passthrough() {
        let mut state = settled("alpha");
        let routed = state.process_line("data:image/png;base64,AAA", &PASSTHROUGH);
        assert!(!routed.passthrough);
        assert!(routed.message.is_some());
    }

    #[test]
    fn message_body_keeps_colons_verbatim() {
        let message = Message {
            channel: "alpha".into(),
            body: "t=1:v=2".into(),
        };
        assert_eq!(message.encode(), "alpha:t=1:v=2");
    }
}
