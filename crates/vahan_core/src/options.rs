use std::fmt;

/// One selectable dropdown item: the wire-level value and its caption.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for SelectOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (value={})", self.label, self.value)
    }
}

/// The three cascading selectors of the report page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    YAxis,
    XAxis,
    Year,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::YAxis, Axis::XAxis, Axis::Year];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::YAxis => write!(f, "Y-Axis"),
            Axis::XAxis => write!(f, "X-Axis"),
            Axis::Year => write!(f, "Year"),
        }
    }
}

/// Operator-supplied labels, matched against discovered options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    pub y_label: String,
    pub x_label: String,
    pub year_label: String,
}

impl SelectionRequest {
    pub fn new(
        y_label: impl Into<String>,
        x_label: impl Into<String>,
        year_label: impl Into<String>,
    ) -> Self {
        Self {
            y_label: y_label.into(),
            x_label: x_label.into(),
            year_label: year_label.into(),
        }
    }

    pub fn label(&self, axis: Axis) -> &str {
        match axis {
            Axis::YAxis => &self.y_label,
            Axis::XAxis => &self.x_label,
            Axis::Year => &self.year_label,
        }
    }
}

/// Fully resolved selection chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub y: SelectOption,
    pub x: SelectOption,
    pub year: SelectOption,
}

/// Case-insensitive exact label match first, then the first option whose
/// label contains the query. Blank queries never match.
pub fn match_option<'a>(label: &str, options: &'a [SelectOption]) -> Option<&'a SelectOption> {
    let query = label.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }
    options
        .iter()
        .find(|opt| opt.label.trim().to_lowercase() == query)
        .or_else(|| {
            options
                .iter()
                .find(|opt| opt.label.trim().to_lowercase().contains(&query))
        })
}
