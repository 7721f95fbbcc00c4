use crate::definitions::GraphicFlags;

/// Scanner states.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    PlainText = 0,
    Escape = 1,
    Parameters = 2,
}

pub const ESC: char = '\u{1b}';

/// CSI closers that are recognised but have no meaning for static output
/// (cursor movement, erasing, scrolling, modes, cursor save/restore).
pub const IGNORED_CSI_CLOSERS: &[u8] = b"ABCDEFGHJKSTfhilnsu";

const fn rgb(r: i32, g: i32, b: i32) -> i32 {
    (r << 16) | (g << 8) | b
}

const CUBE_LEVELS: [i32; 6] = [0x00, 0x5f, 0x87, 0xaf, 0xd7, 0xff];

const fn build_palette() -> [i32; 256] {
    let mut palette = [0; 256];

    // 0-15: xterm defaults for the standard and bright colours
    let named = [
        rgb(0x00, 0x00, 0x00),
        rgb(0xcd, 0x00, 0x00),
        rgb(0x00, 0xcd, 0x00),
        rgb(0xcd, 0xcd, 0x00),
        rgb(0x00, 0x00, 0xee),
        rgb(0xcd, 0x00, 0xcd),
        rgb(0x00, 0xcd, 0xcd),
        rgb(0xe5, 0xe5, 0xe5),
        rgb(0x7f, 0x7f, 0x7f),
        rgb(0xff, 0x00, 0x00),
        rgb(0x00, 0xff, 0x00),
        rgb(0xff, 0xff, 0x00),
        rgb(0x5c, 0x5c, 0xff),
        rgb(0xff, 0x00, 0xff),
        rgb(0x00, 0xff, 0xff),
        rgb(0xff, 0xff, 0xff),
    ];
    let mut i = 0;
    while i < 16 {
        palette[i] = named[i];
        i += 1;
    }

    // 16-231: 6x6x6 cube
    while i < 232 {
        let cube = i - 16;
        palette[i] = rgb(
            CUBE_LEVELS[cube / 36],
            CUBE_LEVELS[(cube / 6) % 6],
            CUBE_LEVELS[cube % 6],
        );
        i += 1;
    }

    // 232-255: grayscale ramp
    while i < 256 {
        let level = 8 + 10 * (i as i32 - 232);
        palette[i] = rgb(level, level, level);
        i += 1;
    }
    palette
}

/// The xterm 256-colour palette as `0xRRGGBB`.
pub const PALETTE: [i32; 256] = build_palette();

/// CSS rule for one simple attribute class.
pub struct StyleRule {
    pub flag: GraphicFlags,
    pub class: &'static str,
    /// Native tag used for this attribute in optimized HTML.
    pub tag: Option<&'static str>,
    pub css: &'static str,
}

pub const BLINK_KEYFRAMES: &str = "@keyframes ansi-blink{50%{opacity:0}}";

/// Simple attribute classes, in class-attribute and style-sheet order.
/// Blink keyframes go right before the first blink rule.
pub const STYLE_RULES: [StyleRule; 8] = [
    StyleRule { flag: GraphicFlags::BOLD, class: "ansi-b", tag: Some("b"), css: "font-weight:bold" },
    StyleRule { flag: GraphicFlags::LIGHT, class: "ansi-l", tag: None, css: "font-weight:lighter" },
    StyleRule { flag: GraphicFlags::ITALIC, class: "ansi-i", tag: Some("i"), css: "font-style:italic" },
    StyleRule {
        flag: GraphicFlags::SLOW_BLINK,
        class: "ansi-sb",
        tag: None,
        css: "animation:ansi-blink 1s step-start infinite",
    },
    StyleRule {
        flag: GraphicFlags::FAST_BLINK,
        class: "ansi-fb",
        tag: None,
        css: "animation:ansi-blink 0.3s step-start infinite",
    },
    StyleRule { flag: GraphicFlags::PROPORTIONAL, class: "ansi-p", tag: None, css: "font-family:sans-serif" },
    StyleRule {
        flag: GraphicFlags::SUPERSCRIPT,
        class: "ansi-sup",
        tag: Some("sup"),
        css: "vertical-align:super;font-size:smaller",
    },
    StyleRule {
        flag: GraphicFlags::SUBSCRIPT,
        class: "ansi-sub",
        tag: Some("sub"),
        css: "vertical-align:sub;font-size:smaller",
    },
];

/// Composite classes for every legal combination of the decoration bits.
/// `flag` holds the exact combination.
pub const DECORATION_RULES: [StyleRule; 11] = [
    StyleRule { flag: GraphicFlags::UNDERLINE, class: "ansi-u", tag: Some("u"), css: "text-decoration:underline" },
    StyleRule {
        flag: GraphicFlags::DOUBLE_UNDERLINE,
        class: "ansi-d",
        tag: None,
        css: "text-decoration:underline;text-decoration-style:double",
    },
    StyleRule { flag: GraphicFlags::OVERLINE, class: "ansi-v", tag: None, css: "text-decoration:overline" },
    StyleRule { flag: GraphicFlags::CROSS_OUT, class: "ansi-s", tag: Some("s"), css: "text-decoration:line-through" },
    StyleRule {
        flag: GraphicFlags::UNDERLINE.union(GraphicFlags::CROSS_OUT),
        class: "ansi-us",
        tag: None,
        css: "text-decoration:underline line-through",
    },
    StyleRule {
        flag: GraphicFlags::UNDERLINE.union(GraphicFlags::OVERLINE),
        class: "ansi-uv",
        tag: None,
        css: "text-decoration:underline overline",
    },
    StyleRule {
        flag: GraphicFlags::UNDERLINE.union(GraphicFlags::OVERLINE).union(GraphicFlags::CROSS_OUT),
        class: "ansi-uvs",
        tag: None,
        css: "text-decoration:underline overline line-through",
    },
    StyleRule {
        flag: GraphicFlags::DOUBLE_UNDERLINE.union(GraphicFlags::CROSS_OUT),
        class: "ansi-ds",
        tag: None,
        css: "text-decoration:underline line-through;text-decoration-style:double",
    },
    StyleRule {
        flag: GraphicFlags::DOUBLE_UNDERLINE.union(GraphicFlags::OVERLINE),
        class: "ansi-dv",
        tag: None,
        css: "text-decoration:underline overline;text-decoration-style:double",
    },
    StyleRule {
        flag: GraphicFlags::DOUBLE_UNDERLINE.union(GraphicFlags::OVERLINE).union(GraphicFlags::CROSS_OUT),
        class: "ansi-dvs",
        tag: None,
        css: "text-decoration:underline overline line-through;text-decoration-style:double",
    },
    StyleRule {
        flag: GraphicFlags::OVERLINE.union(GraphicFlags::CROSS_OUT),
        class: "ansi-vs",
        tag: None,
        css: "text-decoration:overline line-through",
    },
];

/// Composite class for the decoration bits in `flags`, `None` if there are none.
///
/// Panics on a combination missing from [`DECORATION_RULES`]; the interpreter never
/// lets underline and double-underline coexist, so that would be a table bug.
pub fn decoration_class(flags: GraphicFlags) -> Option<&'static str> {
    let decoration = flags & GraphicFlags::DECORATION;
    if decoration.is_empty() {
        return None;
    }
    match DECORATION_RULES.iter().find(|rule| rule.flag == decoration) {
        Some(rule) => Some(rule.class),
        None => unreachable!("no decoration class for {:?}", decoration),
    }
}
