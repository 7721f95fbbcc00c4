use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

/// Target representation of a conversion. Fixed for the lifetime of a converter.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum OutputKind {
    /// Escape sequences stripped, text passed through.
    #[default]
    PlainText,
    /// `<span>` markup with CSS classes and inline styles, or native tags when optimized.
    Html,
    /// Bold and italic only, Markdown metacharacters backslash-escaped.
    Markdown,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputKind::PlainText => "plain",
            OutputKind::Html => "html",
            OutputKind::Markdown => "markdown",
        };
        f.write_str(name)
    }
}

/// Returned by [`OutputKind::from_str`] for a name it does not know.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseOutputKindError(pub String);

impl fmt::Display for ParseOutputKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown output kind `{}` (expected plain, html or markdown)", self.0)
    }
}

impl std::error::Error for ParseOutputKindError {}

impl FromStr for OutputKind {
    type Err = ParseOutputKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" | "plaintext" => Ok(OutputKind::PlainText),
            "html" => Ok(OutputKind::Html),
            "markdown" | "md" => Ok(OutputKind::Markdown),
            _ => Err(ParseOutputKindError(s.to_owned())),
        }
    }
}

bitflags! {
    /// Text attributes selected by SGR sequences.
    ///
    /// Bold/light, underline/double-underline, slow/fast blink and
    /// superscript/subscript are kept mutually exclusive by the interpreter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GraphicFlags: u16 {
        const BOLD             = 1 << 0;
        const LIGHT            = 1 << 1;
        const ITALIC           = 1 << 2;
        const UNDERLINE        = 1 << 3;
        const DOUBLE_UNDERLINE = 1 << 4;
        const OVERLINE         = 1 << 5;
        const CROSS_OUT        = 1 << 6;
        const SLOW_BLINK       = 1 << 7;
        const FAST_BLINK       = 1 << 8;
        const SUPERSCRIPT      = 1 << 9;
        const SUBSCRIPT        = 1 << 10;
        const INVERSE          = 1 << 11;
        const PROPORTIONAL     = 1 << 12;
        const FOREGROUND       = 1 << 13;
        const BACKGROUND       = 1 << 14;
        const UNDERLINE_COLOR  = 1 << 15;

        /// Attributes drawn as a line through, under or over the text.
        const DECORATION = Self::UNDERLINE.bits()
            | Self::DOUBLE_UNDERLINE.bits()
            | Self::OVERLINE.bits()
            | Self::CROSS_OUT.bits();
        /// The only attributes Markdown can express.
        const MARKDOWN = Self::BOLD.bits() | Self::ITALIC.bits();
    }
}

impl GraphicFlags {
    /// Sets `set` after clearing `cleared`.
    pub fn update(&mut self, set: GraphicFlags, cleared: GraphicFlags) {
        *self = (*self - cleared) | set;
    }
}

/// Foreground value meaning "transparent" (SGR 38;1).
pub const TRANSPARENT: i32 = -1;

/// Complete requested (or applied) text state: attribute bits, colours and concealment.
///
/// Colours are 24-bit `0xRRGGBB` values and only meaningful while the matching
/// `FOREGROUND`/`BACKGROUND`/`UNDERLINE_COLOR` bit is set; they are reset to 0
/// together with the bit.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Rendition {
    pub flags: GraphicFlags,
    pub foreground: i32,
    pub background: i32,
    pub underline_color: i32,
    pub concealed: bool,
}

impl Rendition {
    /// True when nothing would be drawn differently from unstyled text.
    pub fn is_normal(&self) -> bool {
        self.flags.is_empty()
    }

    /// SGR 0: everything back to default, including concealment.
    pub fn reset(&mut self) {
        *self = Rendition::default();
    }

    pub fn set_foreground(&mut self, color: i32) {
        self.foreground = color;
        self.flags.insert(GraphicFlags::FOREGROUND);
    }

    pub fn clear_foreground(&mut self) {
        self.foreground = 0;
        self.flags.remove(GraphicFlags::FOREGROUND);
    }

    pub fn set_background(&mut self, color: i32) {
        self.background = color;
        self.flags.insert(GraphicFlags::BACKGROUND);
    }

    pub fn clear_background(&mut self) {
        self.background = 0;
        self.flags.remove(GraphicFlags::BACKGROUND);
    }

    pub fn set_underline_color(&mut self, color: i32) {
        self.underline_color = color;
        self.flags.insert(GraphicFlags::UNDERLINE_COLOR);
    }

    pub fn clear_underline_color(&mut self) {
        self.underline_color = 0;
        self.flags.remove(GraphicFlags::UNDERLINE_COLOR);
    }

    /// The part of the state that affects markup, i.e. everything but concealment.
    pub fn visual(&self) -> Rendition {
        Rendition { concealed: false, ..*self }
    }

    /// Projection onto what Markdown can express.
    pub fn markdown(&self) -> Rendition {
        Rendition {
            flags: self.flags & GraphicFlags::MARKDOWN,
            ..Rendition::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_clears_before_setting() {
        let mut flags = GraphicFlags::BOLD | GraphicFlags::ITALIC;
        flags.update(GraphicFlags::LIGHT, GraphicFlags::BOLD);
        assert_eq!(flags, GraphicFlags::LIGHT | GraphicFlags::ITALIC);

        // Setting and clearing the same bit leaves it set.
        flags.update(GraphicFlags::LIGHT, GraphicFlags::LIGHT | GraphicFlags::BOLD);
        assert_eq!(flags, GraphicFlags::LIGHT | GraphicFlags::ITALIC);
    }

    #[test]
    fn test_clearing_colour_resets_value() {
        let mut a = Rendition::default();
        a.set_foreground(0x123456);
        a.clear_foreground();
        assert_eq!(a, Rendition::default());
        assert!(a.is_normal());
    }

    #[test]
    fn test_visual_ignores_concealment() {
        let mut a = Rendition::default();
        a.concealed = true;
        assert_eq!(a.visual(), Rendition::default());
    }

    #[test]
    fn test_markdown_projection() {
        let mut a = Rendition::default();
        a.flags = GraphicFlags::BOLD | GraphicFlags::UNDERLINE;
        a.set_background(0xff0000);
        let md = a.markdown();
        assert_eq!(md.flags, GraphicFlags::BOLD);
        assert_eq!(md.background, 0);
    }

    #[test]
    fn test_output_kind_names() {
        assert_eq!("HTML".parse::<OutputKind>(), Ok(OutputKind::Html));
        assert_eq!("md".parse::<OutputKind>(), Ok(OutputKind::Markdown));
        assert_eq!(" text ".parse::<OutputKind>(), Ok(OutputKind::PlainText));
        assert!("rtf".parse::<OutputKind>().is_err());
        assert_eq!(OutputKind::Markdown.to_string(), "markdown");
    }
}
