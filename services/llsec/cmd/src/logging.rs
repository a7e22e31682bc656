use std::fmt;
use std::io::IsTerminal;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const COLOR_RESET: &str = "\x1b[0m";
const COLOR_CYAN: &str = "\x1b[36m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_BRIGHT_YELLOW: &str = "\x1b[93m";
const COLOR_BRIGHT_RED: &str = "\x1b[91m";
const COLOR_BRIGHT_GRAY: &str = "\x1b[90m";

/// Column widths
const COMPONENT_WIDTH: usize = 16;
const LOG_LEVEL_WIDTH: usize = 5;

/// `[timestamp] [component] [level] message` formatter for the llsec node
pub struct LlsecLogFormatter {
    service_name: String,
    color_enabled: bool,
}

/// Log at info level on behalf of a named component
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(component = $component, $($arg)*)
    };
}

/// Log at warn level on behalf of a named component
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(component = $component, $($arg)*)
    };
}

/// Log at debug level on behalf of a named component
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(component = $component, $($arg)*)
    };
}

/// Log at error level on behalf of a named component
#[macro_export]
macro_rules! component_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::error!(component = $component, $($arg)*)
    };
}

impl LlsecLogFormatter {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            color_enabled: std::io::stdout().is_terminal(),
        }
    }

    /// Component column. Frame traffic tagged with a direction shows as
    /// `LLSEC-IN` / `LLSEC-OUT`, other events as `llsec-<component>` or the
    /// bare service name.
    fn component_column(&self, fields: &FieldVisitor) -> String {
        let name = match (fields.direction.as_deref(), fields.component.as_deref()) {
            (Some(direction), _) => {
                format!("{}-{}", self.service_name, direction).to_uppercase()
            }
            (None, Some(comp)) => format!("{}-{}", self.service_name, comp),
            (None, None) => self.service_name.clone(),
        };

        if name.chars().count() > COMPONENT_WIDTH {
            let truncated: String = name.chars().take(COMPONENT_WIDTH - 1).collect();
            format!("{}…", truncated)
        } else {
            format!("{:<width$}", name, width = COMPONENT_WIDTH)
        }
    }

    fn level_column(level: &Level) -> String {
        format!("{:<width$}", level.as_str(), width = LOG_LEVEL_WIDTH)
    }

    fn level_color(&self, level: &Level) -> &'static str {
        if !self.color_enabled {
            return "";
        }
        match *level {
            Level::ERROR => COLOR_BRIGHT_RED,
            Level::WARN => COLOR_BRIGHT_YELLOW,
            Level::INFO => COLOR_GREEN,
            Level::DEBUG | Level::TRACE => COLOR_BRIGHT_GRAY,
        }
    }
}

impl<S, N> FormatEvent<S, N> for LlsecLogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let level = event.metadata().level();

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let (reset, cyan) = if self.color_enabled {
            (COLOR_RESET, COLOR_CYAN)
        } else {
            ("", "")
        };

        write!(
            writer,
            "{}[{}] [{}] [{}{}{}] ",
            cyan,
            timestamp,
            self.component_column(&visitor),
            self.level_color(level),
            Self::level_column(level),
            reset
        )?;
        writeln!(writer, "{}{}", visitor.message, reset)
    }
}

/// Pulls the message, component and frame direction out of an event
#[derive(Default)]
struct FieldVisitor {
    message: String,
    component: Option<String>,
    direction: Option<String>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        let rendered = format!("{:?}", value);
        let unquoted = rendered
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .map(str::to_string)
            .unwrap_or(rendered);

        match field.name() {
            "message" => self.message = unquoted,
            "component" => self.component = Some(unquoted),
            "direction" => self.direction = Some(unquoted),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "component" => self.component = Some(value.to_string()),
            "direction" => self.direction = Some(value.to_string()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(component: Option<&str>, direction: Option<&str>) -> FieldVisitor {
        FieldVisitor {
            message: String::new(),
            component: component.map(str::to_string),
            direction: direction.map(str::to_string),
        }
    }

    #[test]
    fn test_component_column() {
        let formatter = LlsecLogFormatter {
            service_name: "llsec".to_string(),
            color_enabled: false,
        };
        assert_eq!(formatter.component_column(&fields(None, None)), format!("{:<16}", "llsec"));
        assert_eq!(
            formatter.component_column(&fields(Some("selftest"), None)),
            format!("{:<16}", "llsec-selftest")
        );
        assert_eq!(
            formatter.component_column(&fields(Some("a-very-long-name"), None)),
            "llsec-a-very-lo…"
        );
    }

    #[test]
    fn test_direction_tags_frame_traffic() {
        let formatter = LlsecLogFormatter {
            service_name: "llsec".to_string(),
            color_enabled: false,
        };
        assert_eq!(formatter.component_column(&fields(None, Some("in"))), format!("{:<16}", "LLSEC-IN"));
        assert_eq!(
            formatter.component_column(&fields(Some("selftest"), Some("out"))),
            format!("{:<16}", "LLSEC-OUT")
        );
    }

    #[test]
    fn test_level_color_disabled() {
        let formatter = LlsecLogFormatter {
            service_name: "llsec".to_string(),
            color_enabled: false,
        };
        assert_eq!(formatter.level_color(&Level::ERROR), "");
        assert_eq!(LlsecLogFormatter::level_column(&Level::WARN), "WARN ");
    }
}
