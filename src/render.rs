use log::debug;

use crate::definitions::{GraphicFlags, OutputKind, Rendition, TRANSPARENT};
use crate::tables::{decoration_class, StyleRule, BLINK_KEYFRAMES, DECORATION_RULES, STYLE_RULES};

/// Native tags for optimized HTML, outermost first.
const NATIVE_TAGS: [(GraphicFlags, &str); 6] = [
    (GraphicFlags::BOLD, "b"),
    (GraphicFlags::ITALIC, "i"),
    (GraphicFlags::UNDERLINE, "u"),
    (GraphicFlags::CROSS_OUT, "s"),
    (GraphicFlags::SUPERSCRIPT, "sup"),
    (GraphicFlags::SUBSCRIPT, "sub"),
];

/// Turns characters under a requested rendition into output text.
///
/// Markup is emitted lazily: `applied` is what the currently open wrapper renders,
/// and it is only brought in line with the requested state right before a character
/// is written. A stale wrapper is closed before any character; a new one is opened
/// only before a non-whitespace character.
#[derive(Debug)]
pub struct Renderer {
    kind: OutputKind,
    optimize: bool,
    line_break: bool,
    output: String,
    applied: Rendition,
    // Markup that closes the wrapper opened for `applied`.
    closing: String,
    used: GraphicFlags,
    optimized_run: bool,
}

impl Renderer {
    pub fn new(kind: OutputKind) -> Renderer {
        Renderer {
            kind,
            optimize: false,
            line_break: true,
            output: String::with_capacity(256),
            applied: Rendition::default(),
            closing: String::new(),
            used: GraphicFlags::empty(),
            optimized_run: false,
        }
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn optimize(&self) -> bool {
        self.optimize
    }

    pub fn set_optimize(&mut self, optimize: bool) {
        self.optimize = optimize;
    }

    pub fn line_break(&self) -> bool {
        self.line_break
    }

    pub fn set_line_break(&mut self, line_break: bool) {
        self.line_break = line_break;
    }

    /// Starts a new run: drops output and style usage of the previous one.
    pub fn begin(&mut self) {
        self.output.clear();
        self.applied = Rendition::default();
        self.closing.clear();
        self.used = GraphicFlags::empty();
        self.optimized_run = self.optimize;
    }

    /// Closes whatever is still open and hands out the converted text.
    pub fn finish(&mut self) -> String {
        self.close();
        std::mem::take(&mut self.output)
    }

    pub fn put_char(&mut self, c: char, requested: &Rendition) {
        let visible = !requested.concealed;
        match self.kind {
            OutputKind::PlainText => {
                if visible {
                    self.output.push(c);
                }
            }
            OutputKind::Html => {
                self.reconcile(&requested.visual(), !c.is_whitespace());
                if !visible {
                    return;
                }
                match c {
                    '\n' if self.line_break => self.output.push_str("<br/>\n"),
                    _ => escape_html(&mut self.output, c),
                }
            }
            OutputKind::Markdown => {
                if c == '\n' {
                    self.close();
                } else {
                    self.reconcile(&requested.markdown(), !c.is_whitespace());
                }
                if visible {
                    escape_markdown(&mut self.output, c);
                }
            }
        }
    }

    fn reconcile(&mut self, target: &Rendition, opening_allowed: bool) {
        if self.applied == *target {
            return;
        }
        if !opening_allowed && self.applied.is_normal() {
            return;
        }
        self.close();
        if opening_allowed && !target.is_normal() {
            self.open(target);
        }
    }

    fn close(&mut self) {
        self.output.push_str(&self.closing);
        self.closing.clear();
        self.applied = Rendition::default();
    }

    fn open(&mut self, target: &Rendition) {
        match self.kind {
            OutputKind::Html => self.open_html(target),
            OutputKind::Markdown => {
                if target.flags.contains(GraphicFlags::BOLD) {
                    self.output.push('*');
                    self.closing.insert(0, '*');
                }
                if target.flags.contains(GraphicFlags::ITALIC) {
                    self.output.push_str("**");
                    self.closing.insert_str(0, "**");
                }
            }
            OutputKind::PlainText => {}
        }
        self.applied = *target;
        self.used |= target.flags;
    }

    fn open_html(&mut self, target: &Rendition) {
        let mut flags = target.flags;
        let mut tags = Vec::new();
        if self.optimize {
            for (flag, tag) in NATIVE_TAGS {
                // A coloured underline needs the class so the colour reaches the line.
                if flag == GraphicFlags::UNDERLINE && flags.contains(GraphicFlags::UNDERLINE_COLOR) {
                    continue;
                }
                if flags.contains(flag) {
                    tags.push(tag);
                    flags.remove(flag);
                }
            }
        }

        let classes = class_list(flags);
        let style = inline_style(target);

        if !classes.is_empty() || !style.is_empty() {
            self.output.push_str("<span");
            if !classes.is_empty() {
                self.output.push_str(" class=\"");
                self.output.push_str(&classes.join(" "));
                self.output.push('"');
            }
            if !style.is_empty() {
                self.output.push_str(" style=\"");
                self.output.push_str(&style);
                self.output.push('"');
            }
            self.output.push('>');
        }
        for tag in &tags {
            self.output.push('<');
            self.output.push_str(tag);
            self.output.push('>');
        }
        for tag in tags.iter().rev() {
            self.closing.push_str("</");
            self.closing.push_str(tag);
            self.closing.push('>');
        }
        if !classes.is_empty() || !style.is_empty() {
            self.closing.push_str("</span>");
        }
    }

    /// CSS rules for every class used in the last run, one per line.
    ///
    /// With `apply_to_defaults` after an optimized run, rules that have a native tag
    /// equivalent also select that tag.
    pub fn styles(&self, apply_to_defaults: bool) -> String {
        if self.kind != OutputKind::Html {
            return String::new();
        }
        let with_tags = apply_to_defaults && self.optimized_run;
        let mut rules = Vec::new();
        let mut keyframes = false;
        for rule in &STYLE_RULES {
            if !self.used.contains(rule.flag) {
                continue;
            }
            let blink = GraphicFlags::SLOW_BLINK | GraphicFlags::FAST_BLINK;
            if blink.contains(rule.flag) && !keyframes {
                rules.push(BLINK_KEYFRAMES.to_owned());
                keyframes = true;
            }
            rules.push(css_rule(rule, with_tags));
        }
        if self.used.intersects(GraphicFlags::DECORATION) {
            rules.extend(DECORATION_RULES.iter().map(|rule| css_rule(rule, with_tags)));
        }
        debug!("Style sheet covers {} rules for {:?}", rules.len(), self.used);
        rules.join("\n")
    }
}

fn css_rule(rule: &StyleRule, with_tags: bool) -> String {
    match rule.tag {
        Some(tag) if with_tags => format!("{tag},.{}{{{}}}", rule.class, rule.css),
        _ => format!(".{}{{{}}}", rule.class, rule.css),
    }
}

fn class_list(flags: GraphicFlags) -> Vec<&'static str> {
    let mut classes: Vec<&'static str> = STYLE_RULES
        .iter()
        .filter(|rule| flags.contains(rule.flag))
        .map(|rule| rule.class)
        .collect();
    if let Some(class) = decoration_class(flags) {
        classes.push(class);
    }
    classes
}

fn css_color(color: i32) -> String {
    if color == TRANSPARENT {
        "transparent".to_owned()
    } else {
        format!("#{:06x}", color & 0xff_ffff)
    }
}

fn inline_style(target: &Rendition) -> String {
    let flags = target.flags;
    let foreground = flags.contains(GraphicFlags::FOREGROUND).then_some(target.foreground);
    let background = flags.contains(GraphicFlags::BACKGROUND).then_some(target.background);

    let inverse = flags.contains(GraphicFlags::INVERSE) && foreground != Some(TRANSPARENT);
    let (foreground, background) = if inverse {
        (background, foreground)
    } else {
        (foreground, background)
    };

    let mut parts = Vec::new();
    if let Some(color) = foreground {
        parts.push(format!("color:{}", css_color(color)));
    }
    if let Some(color) = background {
        parts.push(format!("background-color:{}", css_color(color)));
    }
    if flags.contains(GraphicFlags::UNDERLINE_COLOR) {
        parts.push(format!("text-decoration-color:{}", css_color(target.underline_color)));
    }
    parts.join(";")
}

fn escape_html(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("&quot;"),
        '&' => out.push_str("&amp;"),
        '\'' => out.push_str("&apos;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        _ => out.push(c),
    }
}

fn escape_markdown(out: &mut String, c: char) {
    if matches!(c, '*' | '-' | '#' | '_' | '<' | '>' | '`' | '[' | '\\') {
        out.push('\\');
    }
    out.push(c);
}
