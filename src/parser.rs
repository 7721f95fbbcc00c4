use crate::decoder::{Decoded, InputQueue};
use crate::definitions::{GraphicFlags, OutputKind, Rendition, TRANSPARENT};
use crate::render::Renderer;
use crate::tables::{State, ESC, IGNORED_CSI_CLOSERS, PALETTE};
use log::{debug, trace, warn};

/// Which colour an extended colour code (38/48/58) targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ColorTarget {
    Foreground,
    Background,
    Underline,
}

/// Converts text with embedded ANSI SGR sequences into plain text, HTML or Markdown.
///
/// Input is collected with [`write`](AnsiConverter::write) and converted in one go by
/// [`read`](AnsiConverter::read), which also resets all per-run state so the same
/// instance can be reused for the next, unrelated stream.
///
/// ```
/// use ansi_render::{AnsiConverter, OutputKind};
///
/// let mut converter = AnsiConverter::new(OutputKind::Html);
/// converter.write(b"\x1b[1mbold\x1b[0mplain");
/// assert_eq!(converter.read(), "<span class=\"ansi-b\">bold</span>plain");
/// assert_eq!(converter.styles(false), ".ansi-b{font-weight:bold}");
/// ```
#[derive(Debug)]
pub struct AnsiConverter {
    input: InputQueue,
    state: State,
    params: Vec<u32>,
    // Set by a bad parameter byte; the sequence is dropped at its closer.
    sequence_invalid: bool,
    rendition: Rendition,
    renderer: Renderer,
    invalid: bool,
}

impl Default for AnsiConverter {
    fn default() -> Self {
        Self::new(OutputKind::default())
    }
}

impl AnsiConverter {
    pub fn new(kind: OutputKind) -> AnsiConverter {
        AnsiConverter {
            input: InputQueue::new(),
            state: State::PlainText,
            params: Vec::with_capacity(8),
            sequence_invalid: false,
            rendition: Rendition::default(),
            renderer: Renderer::new(kind),
            invalid: false,
        }
    }

    pub fn output_kind(&self) -> OutputKind {
        self.renderer.kind()
    }

    /// Use `<b>`, `<i>`, `<u>`, `<s>`, `<sup>` and `<sub>` where possible (HTML only).
    pub fn set_optimize(&mut self, optimize: bool) {
        self.renderer.set_optimize(optimize);
    }

    pub fn optimize(&self) -> bool {
        self.renderer.optimize()
    }

    /// Emit `<br/>` before every newline (HTML only, on by default).
    pub fn set_line_break(&mut self, line_break: bool) {
        self.renderer.set_line_break(line_break);
    }

    pub fn line_break(&self) -> bool {
        self.renderer.line_break()
    }

    /// Queues a chunk of input. Nothing is decoded until [`read`](Self::read).
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) {
        self.input.push(bytes.as_ref());
    }

    /// True if the last [`read`](Self::read) met malformed UTF-8 or an escape sequence
    /// it could not interpret.
    pub fn has_invalid_data(&self) -> bool {
        self.invalid
    }

    /// CSS covering the classes used by the last [`read`](Self::read); empty unless the
    /// output kind is HTML.
    pub fn styles(&self, apply_to_defaults: bool) -> String {
        self.renderer.styles(apply_to_defaults)
    }

    /// Converts everything written so far and starts over.
    pub fn read(&mut self) -> String {
        debug!("Converting {} bytes to {}", self.input.pending_len(), self.output_kind());
        self.state = State::PlainText;
        self.clear_sequence();
        self.rendition.reset();
        self.renderer.begin();
        self.invalid = false;

        loop {
            match self.input.next_char() {
                Decoded::Char(c) => self.advance(c),
                Decoded::Invalid => self.invalid = true,
                Decoded::EndOfStream => break,
            }
        }

        if self.state != State::PlainText {
            warn!("Input ends inside an escape sequence: {:?} {:?}", self.state, self.params);
            self.invalid = true;
            self.state = State::PlainText;
            self.clear_sequence();
        }
        self.input.clear();
        self.rendition.reset();

        let output = self.renderer.finish();
        debug!("Converted to {} bytes, invalid data: {}", output.len(), self.invalid);
        output
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.sequence_invalid = false;
    }

    fn advance(&mut self, c: char) {
        match self.state {
            State::PlainText => {
                if c == ESC {
                    self.state = State::Escape;
                } else {
                    self.renderer.put_char(c, &self.rendition);
                }
            }
            State::Escape => match c {
                '[' => {
                    self.clear_sequence();
                    self.params.push(0);
                    self.state = State::Parameters;
                }
                _ => {
                    debug!("Unsupported escape type: {:?}", c);
                    self.invalid = true;
                    self.renderer.put_char(c, &self.rendition);
                    self.state = State::PlainText;
                }
            },
            State::Parameters => match c {
                '0'..='9' => {
                    let digit = c as u32 - '0' as u32;
                    if let Some(last) = self.params.last_mut() {
                        *last = last.saturating_mul(10).saturating_add(digit);
                    }
                }
                ';' | ':' => self.params.push(0),
                '@'..='~' => {
                    self.dispatch(c as u8);
                    self.clear_sequence();
                    self.state = State::PlainText;
                }
                _ => {
                    warn!("Invalid byte in CSI parameters: {:?}", c);
                    self.invalid = true;
                    self.sequence_invalid = true;
                }
            },
        }
    }

    fn dispatch(&mut self, closer: u8) {
        trace!("CSI {:?} {}", self.params, closer as char);
        if self.sequence_invalid {
            return;
        }
        if closer == b'm' {
            let params = std::mem::take(&mut self.params);
            self.apply_sgr(&params);
            self.params = params;
        } else if IGNORED_CSI_CLOSERS.contains(&closer) {
            debug!("Ignoring CSI {}", closer as char);
        } else {
            warn!("Unknown CSI closer: {}", closer as char);
            self.invalid = true;
        }
    }

    /// Applies one SGR parameter list; stops at the first code it cannot interpret.
    fn apply_sgr(&mut self, params: &[u32]) {
        let r = &mut self.rendition;
        let mut i = 0;
        while i < params.len() {
            let code = params[i];
            i += 1;
            match code {
                0 => r.reset(),
                1 => r.flags.update(GraphicFlags::BOLD, GraphicFlags::LIGHT),
                2 => r.flags.update(GraphicFlags::LIGHT, GraphicFlags::BOLD),
                3 => r.flags.insert(GraphicFlags::ITALIC),
                4 => r.flags.update(GraphicFlags::UNDERLINE, GraphicFlags::DOUBLE_UNDERLINE),
                5 => r.flags.update(GraphicFlags::SLOW_BLINK, GraphicFlags::FAST_BLINK),
                6 => r.flags.update(GraphicFlags::FAST_BLINK, GraphicFlags::SLOW_BLINK),
                7 => r.flags.insert(GraphicFlags::INVERSE),
                8 => r.concealed = true,
                9 => r.flags.insert(GraphicFlags::CROSS_OUT),
                21 => r.flags.update(GraphicFlags::DOUBLE_UNDERLINE, GraphicFlags::UNDERLINE),
                22 => r.flags.remove(GraphicFlags::BOLD | GraphicFlags::LIGHT),
                23 => r.flags.remove(GraphicFlags::ITALIC),
                24 => r.flags.remove(GraphicFlags::UNDERLINE | GraphicFlags::DOUBLE_UNDERLINE),
                25 => r.flags.remove(GraphicFlags::SLOW_BLINK | GraphicFlags::FAST_BLINK),
                26 => r.flags.insert(GraphicFlags::PROPORTIONAL),
                27 => r.flags.remove(GraphicFlags::INVERSE),
                28 => r.concealed = false,
                29 => r.flags.remove(GraphicFlags::CROSS_OUT),
                30..=37 => r.set_foreground(PALETTE[(code - 30) as usize]),
                39 => r.clear_foreground(),
                40..=47 => r.set_background(PALETTE[(code - 40) as usize]),
                49 => r.clear_background(),
                50 => r.flags.remove(GraphicFlags::PROPORTIONAL),
                53 => r.flags.insert(GraphicFlags::OVERLINE),
                55 => r.flags.remove(GraphicFlags::OVERLINE),
                59 => r.clear_underline_color(),
                73 => r.flags.update(GraphicFlags::SUPERSCRIPT, GraphicFlags::SUBSCRIPT),
                74 => r.flags.update(GraphicFlags::SUBSCRIPT, GraphicFlags::SUPERSCRIPT),
                75 => r.flags.remove(GraphicFlags::SUPERSCRIPT | GraphicFlags::SUBSCRIPT),
                90..=97 => r.set_foreground(PALETTE[(code - 90 + 8) as usize]),
                100..=107 => r.set_background(PALETTE[(code - 100 + 8) as usize]),
                10..=20 | 51 | 52 | 54 | 60..=65 => debug!("Ignoring SGR {}", code),
                38 | 48 | 58 => {
                    let target = match code {
                        38 => ColorTarget::Foreground,
                        48 => ColorTarget::Background,
                        _ => ColorTarget::Underline,
                    };
                    let Some((color, used)) = extended_color(&params[i..], target) else {
                        warn!("Invalid extended colour in SGR {:?}", params);
                        self.invalid = true;
                        return;
                    };
                    i += used;
                    match target {
                        ColorTarget::Foreground => r.set_foreground(color),
                        ColorTarget::Background => r.set_background(color),
                        ColorTarget::Underline => r.set_underline_color(color),
                    }
                }
                _ => {
                    warn!("Unknown SGR code: {}", code);
                    self.invalid = true;
                    return;
                }
            }
        }
    }
}

/// Parses the colour space selector and arguments following 38/48/58.
/// Returns the colour and how many parameters it consumed.
fn extended_color(params: &[u32], target: ColorTarget) -> Option<(i32, usize)> {
    let (&space, args) = params.split_first()?;
    let channel = |index: usize| -> Option<i32> {
        let value = *args.get(index)?;
        (value < 256).then_some(value as i32)
    };
    match space {
        1 if target == ColorTarget::Foreground => Some((TRANSPARENT, 1)),
        2 => {
            let (r, g, b) = (channel(0)?, channel(1)?, channel(2)?);
            Some(((r << 16) | (g << 8) | b, 4))
        }
        3 => {
            let (c, m, y) = (channel(0)?, channel(1)?, channel(2)?);
            Some((((255 - c) << 16) | ((255 - m) << 8) | (255 - y), 4))
        }
        4 => {
            let (c, m, y, k) = (channel(0)?, channel(1)?, channel(2)?, channel(3)?);
            let scale = |v: i32| (255 - v) * (255 - k) / 255;
            Some(((scale(c) << 16) | (scale(m) << 8) | scale(y), 5))
        }
        5 => {
            let index = channel(0)?;
            Some((PALETTE[index as usize], 2))
        }
        _ => None,
    }
}

#[cfg(test)]
mod comprehensive_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn rendition_after(input: &[u8]) -> (Rendition, bool) {
        let mut converter = AnsiConverter::new(OutputKind::PlainText);
        for &byte in input {
            converter.advance(byte as char);
        }
        (converter.rendition, converter.invalid)
    }

    // ========== SCANNER TESTS ==========

    #[test]
    fn test_scanner_returns_to_plain_text() {
        let mut converter = AnsiConverter::new(OutputKind::PlainText);
        for c in "\x1b[1;2".chars() {
            converter.advance(c);
        }
        assert_eq!(converter.state, State::Parameters);
        assert_eq!(converter.params, vec![1, 2]);
        converter.advance('m');
        assert_eq!(converter.state, State::PlainText);
        assert!(converter.params.is_empty());
    }

    #[test]
    fn test_escape_after_escape_is_emitted() {
        let mut converter = AnsiConverter::new(OutputKind::PlainText);
        converter.write(b"a\x1b\x1b[1mb");
        assert_eq!(converter.read(), "a\x1b[1mb");
        assert!(converter.has_invalid_data());
        assert_eq!(converter.rendition, Rendition::default());
    }

    #[test]
    fn test_colon_separates_parameters() {
        let (r, invalid) = rendition_after(b"\x1b[38:2:1:2:3m");
        assert!(!invalid);
        assert_eq!(r.foreground, 0x010203);
    }

    #[test]
    fn test_empty_parameters_mean_zero() {
        let (r, invalid) = rendition_after(b"\x1b[1m\x1b[;m");
        assert!(!invalid);
        assert_eq!(r, Rendition::default());
    }

    #[test]
    fn test_bad_separator_drops_sequence() {
        let (r, invalid) = rendition_after(b"\x1b[1,3m");
        assert!(invalid);
        assert_eq!(r, Rendition::default());
    }

    #[test]
    fn test_ignored_cursor_controls() {
        for closer in IGNORED_CSI_CLOSERS {
            let input = format!("\x1b[3{}", *closer as char);
            let (r, invalid) = rendition_after(input.as_bytes());
            assert!(!invalid, "CSI {} should be accepted", *closer as char);
            assert_eq!(r, Rendition::default());
        }
    }

    #[test]
    fn test_unknown_closer_is_invalid() {
        let (_, invalid) = rendition_after(b"\x1b[2q");
        assert!(invalid);
    }

    #[test]
    fn test_huge_parameter_saturates() {
        let (r, invalid) = rendition_after(b"\x1b[99999999999999999999m");
        assert!(invalid);
        assert_eq!(r, Rendition::default());
    }

    // ========== SGR ATTRIBUTE TESTS ==========

    #[test_case(b"\x1b[1m", GraphicFlags::BOLD ; "bold")]
    #[test_case(b"\x1b[1;2m", GraphicFlags::LIGHT ; "light replaces bold")]
    #[test_case(b"\x1b[2;1m", GraphicFlags::BOLD ; "bold replaces light")]
    #[test_case(b"\x1b[1;3;22m", GraphicFlags::ITALIC ; "normal intensity")]
    #[test_case(b"\x1b[4;21m", GraphicFlags::DOUBLE_UNDERLINE ; "double replaces underline")]
    #[test_case(b"\x1b[21;4m", GraphicFlags::UNDERLINE ; "underline replaces double")]
    #[test_case(b"\x1b[4;24m", GraphicFlags::empty() ; "underline off")]
    #[test_case(b"\x1b[5;6m", GraphicFlags::FAST_BLINK ; "fast replaces slow")]
    #[test_case(b"\x1b[6;5m", GraphicFlags::SLOW_BLINK ; "slow replaces fast")]
    #[test_case(b"\x1b[5;25m", GraphicFlags::empty() ; "blink off")]
    #[test_case(b"\x1b[7;27m", GraphicFlags::empty() ; "inverse off")]
    #[test_case(b"\x1b[9;53m", GraphicFlags::CROSS_OUT.union(GraphicFlags::OVERLINE) ; "cross out and overline")]
    #[test_case(b"\x1b[9;29;53;55m", GraphicFlags::empty() ; "cross out and overline off")]
    #[test_case(b"\x1b[26m", GraphicFlags::PROPORTIONAL ; "proportional")]
    #[test_case(b"\x1b[26;50m", GraphicFlags::empty() ; "proportional off")]
    #[test_case(b"\x1b[73;74m", GraphicFlags::SUBSCRIPT ; "subscript replaces superscript")]
    #[test_case(b"\x1b[74;73m", GraphicFlags::SUPERSCRIPT ; "superscript replaces subscript")]
    #[test_case(b"\x1b[73;75m", GraphicFlags::empty() ; "script off")]
    #[test_case(b"\x1b[1;10;20;51;52;54;60;65m", GraphicFlags::BOLD ; "ignored codes")]
    fn test_sgr_flags(input: &[u8], expected: GraphicFlags) {
        let (r, invalid) = rendition_after(input);
        assert!(!invalid);
        assert_eq!(r.flags, expected);
    }

    #[test]
    fn test_separate_sequences_accumulate() {
        let (r, _) = rendition_after(b"\x1b[1m\x1b[2m");
        assert_eq!(r.flags, GraphicFlags::LIGHT);
    }

    #[test]
    fn test_conceal_and_reveal() {
        let (r, _) = rendition_after(b"\x1b[8m");
        assert!(r.concealed);
        let (r, _) = rendition_after(b"\x1b[8;28m");
        assert!(!r.concealed);
        let (r, _) = rendition_after(b"\x1b[8;0m");
        assert!(!r.concealed);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (r, invalid) = rendition_after(b"\x1b[1;3;4;31;42;58;5;9m\x1b[0m");
        assert!(!invalid);
        assert_eq!(r, Rendition::default());
    }

    #[test]
    fn test_unknown_code_aborts_rest_of_sequence() {
        let (r, invalid) = rendition_after(b"\x1b[1;999;3m");
        assert!(invalid);
        assert_eq!(r.flags, GraphicFlags::BOLD);
    }

    // ========== COLOUR TESTS ==========

    #[test_case(b"\x1b[31m", 0xcd0000 ; "standard red")]
    #[test_case(b"\x1b[37m", 0xe5e5e5 ; "standard white")]
    #[test_case(b"\x1b[90m", 0x7f7f7f ; "bright black")]
    #[test_case(b"\x1b[94m", 0x5c5cff ; "bright blue")]
    #[test_case(b"\x1b[38;2;32;64;96m", 0x204060 ; "rgb")]
    #[test_case(b"\x1b[38;3;32;64;96m", 0xdfbf9f ; "cmy")]
    #[test_case(b"\x1b[38;4;32;64;96;128m", 0x6f5f4f ; "cmyk")]
    #[test_case(b"\x1b[38;5;100m", 0x878700 ; "indexed")]
    #[test_case(b"\x1b[38;5;255m", 0xeeeeee ; "indexed gray")]
    #[test_case(b"\x1b[38;1m", TRANSPARENT ; "transparent")]
    fn test_foreground(input: &[u8], expected: i32) {
        let (r, invalid) = rendition_after(input);
        assert!(!invalid);
        assert!(r.flags.contains(GraphicFlags::FOREGROUND));
        assert_eq!(r.foreground, expected);
    }

    #[test]
    fn test_background_and_underline_colours() {
        let (r, invalid) = rendition_after(b"\x1b[41;58;2;1;2;3m");
        assert!(!invalid);
        assert_eq!(r.background, 0xcd0000);
        assert_eq!(r.underline_color, 0x010203);
        assert!(r.flags.contains(GraphicFlags::BACKGROUND | GraphicFlags::UNDERLINE_COLOR));

        let (r, _) = rendition_after(b"\x1b[107m");
        assert_eq!(r.background, 0xffffff);
    }

    #[test]
    fn test_default_colours_clear() {
        let (r, invalid) = rendition_after(b"\x1b[31;41;58;5;1m\x1b[39;49;59m");
        assert!(!invalid);
        assert_eq!(r, Rendition::default());
    }

    #[test]
    fn test_colour_consumes_its_parameters() {
        let (r, invalid) = rendition_after(b"\x1b[38;5;1;1m");
        assert!(!invalid);
        assert_eq!(r.foreground, 0xcd0000);
        assert_eq!(r.flags, GraphicFlags::FOREGROUND | GraphicFlags::BOLD);
    }

    #[test_case(b"\x1b[48;1m" ; "transparent background")]
    #[test_case(b"\x1b[58;1m" ; "transparent underline")]
    #[test_case(b"\x1b[38;2;1;2m" ; "missing channel")]
    #[test_case(b"\x1b[38;2;1;2;256m" ; "channel out of range")]
    #[test_case(b"\x1b[38;5;256m" ; "index out of range")]
    #[test_case(b"\x1b[38;5m" ; "missing index")]
    #[test_case(b"\x1b[38m" ; "missing space")]
    #[test_case(b"\x1b[38;6;1m" ; "unknown space")]
    fn test_invalid_extended_colour(input: &[u8]) {
        let (r, invalid) = rendition_after(input);
        assert!(invalid);
        assert_eq!(r, Rendition::default());
    }

    #[test]
    fn test_invalid_colour_keeps_previous_and_aborts() {
        let (r, invalid) = rendition_after(b"\x1b[32m\x1b[38;2;300;0;0;1m");
        assert!(invalid);
        assert_eq!(r.foreground, 0x00cd00);
        assert!(!r.flags.contains(GraphicFlags::BOLD));
    }
}
