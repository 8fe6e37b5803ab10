//! Cell formats, merges and sheet dimensions read from the xlsx package.
//!
//! calamine only exposes values, so the package parts that carry the look
//! of a sheet (`xl/styles.xml` and each worksheet's `<cols>`, `<row>`,
//! `<c s=..>` and `<mergeCells>`) are parsed here and replayed through
//! rust_xlsxwriter on save.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek};
use std::path::Path;

use plandiff_core::{Address, CellRange};
use plandiff_recon::document::Rgb;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatUnderline};
use zip::ZipArchive;

// ============================================================================
// Style model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderLine {
    #[default]
    None,
    Thin,
    Medium,
    Dashed,
    Dotted,
    Thick,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderLine {
    fn parse(s: &str) -> Self {
        match s {
            "thin" => Self::Thin,
            "medium" => Self::Medium,
            "dashed" => Self::Dashed,
            "dotted" => Self::Dotted,
            "thick" => Self::Thick,
            "double" => Self::Double,
            "hair" => Self::Hair,
            "mediumDashed" => Self::MediumDashed,
            "dashDot" => Self::DashDot,
            "mediumDashDot" => Self::MediumDashDot,
            "dashDotDot" => Self::DashDotDot,
            "mediumDashDotDot" => Self::MediumDashDotDot,
            "slantDashDot" => Self::SlantDashDot,
            _ => Self::None,
        }
    }

    fn to_xlsx(self) -> FormatBorder {
        match self {
            Self::None => FormatBorder::None,
            Self::Thin => FormatBorder::Thin,
            Self::Medium => FormatBorder::Medium,
            Self::Dashed => FormatBorder::Dashed,
            Self::Dotted => FormatBorder::Dotted,
            Self::Thick => FormatBorder::Thick,
            Self::Double => FormatBorder::Double,
            Self::Hair => FormatBorder::Hair,
            Self::MediumDashed => FormatBorder::MediumDashed,
            Self::DashDot => FormatBorder::DashDot,
            Self::MediumDashDot => FormatBorder::MediumDashDot,
            Self::DashDotDot => FormatBorder::DashDotDot,
            Self::MediumDashDotDot => FormatBorder::MediumDashDotDot,
            Self::SlantDashDot => FormatBorder::SlantDashDot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BorderSide {
    pub line: BorderLine,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberFormat {
    /// One of Excel's built-in format ids (1-49 and locale ids up to 255).
    Builtin(u8),
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterAcross,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

/// One resolved `<cellXfs>` entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellStyle {
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<Rgb>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub fill: Option<Rgb>,
    pub top: BorderSide,
    pub right: BorderSide,
    pub bottom: BorderSide,
    pub left: BorderSide,
    pub number_format: Option<NumberFormat>,
    pub horizontal: Option<HAlign>,
    pub vertical: Option<VAlign>,
    pub wrap: bool,
    pub shrink: bool,
    pub indent: u8,
}

impl CellStyle {
    /// The rust_xlsxwriter format for this style, with the font color
    /// replaced by `font_color` when given.
    pub fn to_format(&self, font_color: Option<Rgb>) -> Format {
        let mut format = Format::new();

        if let Some(name) = &self.font_name {
            format = format.set_font_name(name);
        }
        if let Some(size) = self.font_size {
            format = format.set_font_size(size);
        }
        if let Some(rgb) = font_color.or(self.font_color) {
            format = format.set_font_color(Color::RGB(rgb));
        }
        if self.bold {
            format = format.set_bold();
        }
        if self.italic {
            format = format.set_italic();
        }
        if self.underline {
            format = format.set_underline(FormatUnderline::Single);
        }
        if self.strikethrough {
            format = format.set_font_strikethrough();
        }
        if let Some(rgb) = self.fill {
            format = format.set_background_color(Color::RGB(rgb));
        }

        if self.top.line != BorderLine::None {
            format = format.set_border_top(self.top.line.to_xlsx());
            if let Some(rgb) = self.top.color {
                format = format.set_border_top_color(Color::RGB(rgb));
            }
        }
        if self.right.line != BorderLine::None {
            format = format.set_border_right(self.right.line.to_xlsx());
            if let Some(rgb) = self.right.color {
                format = format.set_border_right_color(Color::RGB(rgb));
            }
        }
        if self.bottom.line != BorderLine::None {
            format = format.set_border_bottom(self.bottom.line.to_xlsx());
            if let Some(rgb) = self.bottom.color {
                format = format.set_border_bottom_color(Color::RGB(rgb));
            }
        }
        if self.left.line != BorderLine::None {
            format = format.set_border_left(self.left.line.to_xlsx());
            if let Some(rgb) = self.left.color {
                format = format.set_border_left_color(Color::RGB(rgb));
            }
        }

        match &self.number_format {
            Some(NumberFormat::Builtin(id)) => format = format.set_num_format_index(*id),
            Some(NumberFormat::Custom(code)) => format = format.set_num_format(code),
            None => {}
        }

        if let Some(h) = self.horizontal {
            format = format.set_align(match h {
                HAlign::Left => FormatAlign::Left,
                HAlign::Center => FormatAlign::Center,
                HAlign::Right => FormatAlign::Right,
                HAlign::Fill => FormatAlign::Fill,
                HAlign::Justify => FormatAlign::Justify,
                HAlign::CenterAcross => FormatAlign::CenterAcross,
                HAlign::Distributed => FormatAlign::Distributed,
            });
        }
        if let Some(v) = self.vertical {
            format = format.set_align(match v {
                VAlign::Top => FormatAlign::Top,
                VAlign::Center => FormatAlign::VerticalCenter,
                VAlign::Bottom => FormatAlign::Bottom,
                VAlign::Justify => FormatAlign::VerticalJustify,
                VAlign::Distributed => FormatAlign::VerticalDistributed,
            });
        }
        if self.wrap {
            format = format.set_text_wrap();
        }
        if self.shrink {
            format = format.set_shrink();
        }
        if self.indent > 0 {
            format = format.set_indent(self.indent);
        }

        format
    }
}

/// Layout and style references of one worksheet. Columns and rows are
/// 1-based, like [`Address`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    /// `<cellXfs>` index per cell; cells on the default style are absent.
    pub cell_styles: HashMap<Address, usize>,
    /// Custom widths in character units, padding removed.
    pub col_widths: BTreeMap<u32, f64>,
    /// Custom heights in points.
    pub row_heights: BTreeMap<u32, f64>,
    pub col_styles: BTreeMap<u32, usize>,
    pub row_styles: BTreeMap<u32, usize>,
    pub merges: Vec<CellRange>,
}

/// Everything read from the package for a whole workbook.
#[derive(Debug, Clone, Default)]
pub struct WorkbookStyles {
    pub styles: Vec<CellStyle>,
    /// One entry per requested sheet name, in the same order.
    pub sheets: Vec<SheetLayout>,
}

// ============================================================================
// Package entry point
// ============================================================================

/// Read styles and per-sheet layout for `sheet_names` from an xlsx/xlsm
/// package. Fails for anything that is not a zip package (xls, ods).
pub fn read_workbook_styles(path: &Path, sheet_names: &[String]) -> Result<WorkbookStyles, String> {
    let file = std::fs::File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| format!("not an xlsx package: {e}"))?;

    let styles = match read_zip_file(&mut archive, "xl/styles.xml") {
        Ok(xml) => parse_styles_xml(&xml),
        Err(_) => Vec::new(),
    };

    let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml").unwrap_or_default();
    let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
    let parts = worksheet_parts(&workbook_xml, &rels_xml, sheet_names);

    let mut sheets = Vec::with_capacity(parts.len());
    for part in &parts {
        let layout = match part {
            Some(part) => match read_zip_file(&mut archive, part) {
                Ok(xml) => parse_sheet_layout(&xml),
                Err(e) => {
                    tracing::warn!(part = %part, error = %e, "worksheet part unreadable; layout dropped");
                    SheetLayout::default()
                }
            },
            None => SheetLayout::default(),
        };
        sheets.push(layout);
    }

    Ok(WorkbookStyles { styles, sheets })
}

fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, String> {
    let mut file = archive.by_name(name).map_err(|e| format!("{name}: {e}"))?;
    let mut content = String::new();
    file.read_to_string(&mut content).map_err(|e| format!("{name}: {e}"))?;
    Ok(content)
}

/// Map sheet names to their worksheet part through workbook.xml and its
/// relationships.
fn worksheet_parts(workbook_xml: &str, rels_xml: &str, sheet_names: &[String]) -> Vec<Option<String>> {
    let mut name_to_rid: HashMap<String, String> = HashMap::new();
    for_each_element(workbook_xml, |e| {
        if e.name().as_ref() == b"sheet" {
            if let (Some(name), Some(rid)) = (attr(e, b"name"), attr(e, b"r:id")) {
                name_to_rid.insert(name, rid);
            }
        }
    });

    let mut rid_to_target: HashMap<String, String> = HashMap::new();
    for_each_element(rels_xml, |e| {
        if e.name().as_ref() == b"Relationship" {
            if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                rid_to_target.insert(id, target);
            }
        }
    });

    sheet_names
        .iter()
        .map(|name| {
            let target = rid_to_target.get(name_to_rid.get(name)?)?;
            Some(match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("xl/{target}"),
            })
        })
        .collect()
}

// ============================================================================
// styles.xml
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Font {
    name: Option<String>,
    size: Option<f64>,
    color: Option<Rgb>,
    bold: bool,
    italic: bool,
    underline: bool,
    strikethrough: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Borders {
    top: BorderSide,
    right: BorderSide,
    bottom: BorderSide,
    left: BorderSide,
}

/// Parse styles.xml into one [`CellStyle`] per `<cellXfs>` entry.
pub fn parse_styles_xml(xml: &str) -> Vec<CellStyle> {
    let num_fmts = parse_num_fmts(xml);
    let fonts = parse_fonts(xml);
    let fills = parse_fills(xml);
    let borders = parse_borders(xml);

    let mut styles = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut in_cell_xfs = false;
    let mut current: Option<CellStyle> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"cellXfs" => break,
            Ok(Event::Start(ref e)) if in_cell_xfs && e.name().as_ref() == b"xf" => {
                current = Some(resolve_xf(e, &num_fmts, &fonts, &fills, &borders));
            }
            Ok(Event::Empty(ref e)) if in_cell_xfs && e.name().as_ref() == b"xf" => {
                styles.push(resolve_xf(e, &num_fmts, &fonts, &fills, &borders));
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"alignment" => {
                if let Some(style) = current.as_mut() {
                    apply_alignment(style, e);
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"xf" => {
                if let Some(style) = current.take() {
                    styles.push(style);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    styles
}

fn resolve_xf(
    e: &BytesStart,
    num_fmts: &HashMap<u16, String>,
    fonts: &[Font],
    fills: &[Option<Rgb>],
    borders: &[Borders],
) -> CellStyle {
    let mut style = CellStyle::default();

    if let Some(font) = attr_num::<usize>(e, b"fontId").and_then(|id| fonts.get(id)) {
        style.font_name = font.name.clone();
        style.font_size = font.size;
        style.font_color = font.color;
        style.bold = font.bold;
        style.italic = font.italic;
        style.underline = font.underline;
        style.strikethrough = font.strikethrough;
    }
    if let Some(fill) = attr_num::<usize>(e, b"fillId").and_then(|id| fills.get(id)) {
        style.fill = *fill;
    }
    if let Some(b) = attr_num::<usize>(e, b"borderId").and_then(|id| borders.get(id)) {
        style.top = b.top;
        style.right = b.right;
        style.bottom = b.bottom;
        style.left = b.left;
    }
    style.number_format = match attr_num::<u16>(e, b"numFmtId") {
        None | Some(0) => None,
        Some(id) => match num_fmts.get(&id) {
            Some(code) => Some(NumberFormat::Custom(code.clone())),
            None => u8::try_from(id).ok().map(NumberFormat::Builtin),
        },
    };

    style
}

fn apply_alignment(style: &mut CellStyle, e: &BytesStart) {
    style.horizontal = match attr(e, b"horizontal").as_deref() {
        Some("left") => Some(HAlign::Left),
        Some("center") => Some(HAlign::Center),
        Some("right") => Some(HAlign::Right),
        Some("fill") => Some(HAlign::Fill),
        Some("justify") => Some(HAlign::Justify),
        Some("centerContinuous") => Some(HAlign::CenterAcross),
        Some("distributed") => Some(HAlign::Distributed),
        _ => None,
    };
    style.vertical = match attr(e, b"vertical").as_deref() {
        Some("top") => Some(VAlign::Top),
        Some("center") => Some(VAlign::Center),
        Some("justify") => Some(VAlign::Justify),
        Some("distributed") => Some(VAlign::Distributed),
        // bottom is the default
        _ => None,
    };
    style.wrap = attr_flag(e, b"wrapText");
    style.shrink = attr_flag(e, b"shrinkToFit");
    style.indent = attr_num(e, b"indent").unwrap_or(0);
}

/// `<numFmts>`: custom format id to format code.
fn parse_num_fmts(xml: &str) -> HashMap<u16, String> {
    let mut map = HashMap::new();
    for_each_element(xml, |e| {
        if e.name().as_ref() == b"numFmt" {
            if let (Some(id), Some(code)) = (attr_num(e, b"numFmtId"), attr(e, b"formatCode")) {
                map.insert(id, code);
            }
        }
    });
    map
}

fn parse_fonts(xml: &str) -> Vec<Font> {
    let mut fonts = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut in_fonts = false;
    let mut current: Option<Font> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"fonts" => in_fonts = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"fonts" => break,
            Ok(Event::Start(ref e)) if in_fonts && e.name().as_ref() == b"font" => current = Some(Font::default()),
            Ok(Event::Empty(ref e)) if in_fonts && e.name().as_ref() == b"font" => fonts.push(Font::default()),
            Ok(Event::End(ref e)) if e.name().as_ref() == b"font" => {
                if let Some(font) = current.take() {
                    fonts.push(font);
                }
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let Some(font) = current.as_mut() else { continue };
                match e.name().as_ref() {
                    b"b" => font.bold = attr(e, b"val").map_or(true, |v| v != "0" && v != "false"),
                    b"i" => font.italic = attr(e, b"val").map_or(true, |v| v != "0" && v != "false"),
                    b"strike" => font.strikethrough = attr(e, b"val").map_or(true, |v| v != "0" && v != "false"),
                    b"u" => font.underline = attr(e, b"val").map_or(true, |v| v != "none"),
                    b"sz" => font.size = attr_num(e, b"val"),
                    b"name" => font.name = attr(e, b"val"),
                    b"color" => font.color = parse_color(e),
                    _ => {}
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    fonts
}

/// `<fills>`: the pattern foreground color of solid fills.
fn parse_fills(xml: &str) -> Vec<Option<Rgb>> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut in_fills = false;
    let mut current: Option<Option<Rgb>> = None;
    let mut solid = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"fills" => in_fills = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"fills" => break,
            Ok(Event::Start(ref e)) if in_fills && e.name().as_ref() == b"fill" => {
                current = Some(None);
                solid = false;
            }
            Ok(Event::Empty(ref e)) if in_fills && e.name().as_ref() == b"fill" => fills.push(None),
            Ok(Event::End(ref e)) if e.name().as_ref() == b"fill" => {
                if let Some(fill) = current.take() {
                    fills.push(if solid { fill } else { None });
                }
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if current.is_some() => match e.name().as_ref() {
                b"patternFill" => solid = attr(e, b"patternType").as_deref() == Some("solid"),
                b"fgColor" => current = Some(parse_color(e)),
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    fills
}

fn parse_borders(xml: &str) -> Vec<Borders> {
    let mut borders = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut in_borders = false;
    let mut current: Option<Borders> = None;
    // Side being read and its line style
    let mut side: Option<(Vec<u8>, BorderSide)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"borders" => in_borders = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"borders" => break,
            Ok(Event::Start(ref e)) if in_borders && e.name().as_ref() == b"border" => {
                current = Some(Borders::default());
            }
            Ok(Event::Empty(ref e)) if in_borders && e.name().as_ref() == b"border" => {
                borders.push(Borders::default());
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"border" => {
                if let Some(b) = current.take() {
                    borders.push(b);
                }
            }
            Ok(Event::Start(ref e)) if current.is_some() && is_border_side(e.name().as_ref()) => {
                let line = BorderLine::parse(attr(e, b"style").as_deref().unwrap_or(""));
                side = Some((e.name().as_ref().to_vec(), BorderSide { line, color: None }));
            }
            Ok(Event::Empty(ref e)) if is_border_side(e.name().as_ref()) => {
                if let Some(b) = current.as_mut() {
                    let line = BorderLine::parse(attr(e, b"style").as_deref().unwrap_or(""));
                    set_side(b, e.name().as_ref(), BorderSide { line, color: None });
                }
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"color" => {
                if let Some((_, s)) = side.as_mut() {
                    s.color = parse_color(e);
                }
            }
            Ok(Event::End(ref e)) if is_border_side(e.name().as_ref()) => {
                if let (Some(b), Some((name, s))) = (current.as_mut(), side.take()) {
                    set_side(b, &name, s);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    borders
}

fn is_border_side(name: &[u8]) -> bool {
    matches!(name, b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end")
}

fn set_side(borders: &mut Borders, name: &[u8], side: BorderSide) {
    match name {
        b"left" | b"start" => borders.left = side,
        b"right" | b"end" => borders.right = side,
        b"top" => borders.top = side,
        b"bottom" => borders.bottom = side,
        _ => {}
    }
}

// ============================================================================
// Colors
// ============================================================================

/// Resolve `rgb`, `indexed` or `theme` (with `tint`) to 0xRRGGBB.
fn parse_color(e: &BytesStart) -> Option<Rgb> {
    let base = if let Some(hex) = attr(e, b"rgb") {
        parse_argb(&hex)
    } else if let Some(idx) = attr_num::<u8>(e, b"indexed") {
        indexed_color(idx)
    } else if let Some(idx) = attr_num::<u8>(e, b"theme") {
        theme_color(idx)
    } else {
        None
    }?;

    Some(match attr_num::<f64>(e, b"tint") {
        Some(tint) if tint != 0.0 => apply_tint(base, tint),
        _ => base,
    })
}

fn parse_argb(hex: &str) -> Option<Rgb> {
    let hex = hex.trim_start_matches('#');
    let rgb = match hex.len() {
        8 => &hex[2..],
        6 => hex,
        _ => return None,
    };
    u32::from_str_radix(rgb, 16).ok()
}

/// Lighten (positive) or darken (negative) each channel. Excel tints in
/// HSL space; per-channel scaling is close enough for fills and fonts.
fn apply_tint(rgb: Rgb, tint: f64) -> Rgb {
    let channel = |shift: u32| {
        let c = ((rgb >> shift) & 0xFF) as f64;
        let t = if tint < 0.0 { c * (1.0 + tint) } else { c + (255.0 - c) * tint };
        (t.round().clamp(0.0, 255.0) as u32) << shift
    };
    channel(16) | channel(8) | channel(0)
}

/// Office default theme; approximate for workbooks with a custom theme.
fn theme_color(idx: u8) -> Option<Rgb> {
    Some(match idx {
        0 => 0xFFFFFF,
        1 => 0x000000,
        2 => 0xE7E6E6,
        3 => 0x44546A,
        4 => 0x4472C4,
        5 => 0xED7D31,
        6 => 0xA5A5A5,
        7 => 0xFFC000,
        8 => 0x5B9BD5,
        9 => 0x70AD47,
        10 => 0x0563C1,
        11 => 0x954F72,
        _ => return None,
    })
}

/// The legacy 64-entry indexed palette.
fn indexed_color(idx: u8) -> Option<Rgb> {
    const PALETTE: [Rgb; 56] = [
        0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
        0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, //
        0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, //
        0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF, //
        0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99, //
        0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696, //
        0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333,
    ];
    match idx {
        0..=7 => PALETTE.get(idx as usize).copied(),
        8..=63 => PALETTE.get(idx as usize - 8).copied(),
        // System foreground and background
        64 => Some(0x000000),
        65 => Some(0xFFFFFF),
        _ => None,
    }
}

// ============================================================================
// Worksheet XML
// ============================================================================

/// Parse one worksheet part for style ids, dimensions and merges.
pub fn parse_sheet_layout(xml: &str) -> SheetLayout {
    let mut layout = SheetLayout::default();
    for_each_element(xml, |e| match e.name().as_ref() {
        b"c" => {
            let style = attr_num::<usize>(e, b"s").filter(|s| *s > 0);
            let cell = attr(e, b"r").and_then(|r| Address::parse(&r).ok());
            if let (Some(style), Some(cell)) = (style, cell) {
                layout.cell_styles.insert(cell, style);
            }
        }
        b"row" => {
            let Some(row) = attr_num::<u32>(e, b"r") else { return };
            if attr_flag(e, b"customHeight") {
                if let Some(height) = attr_num::<f64>(e, b"ht") {
                    layout.row_heights.insert(row, height);
                }
            }
            if attr_flag(e, b"customFormat") {
                if let Some(style) = attr_num::<usize>(e, b"s").filter(|s| *s > 0) {
                    layout.row_styles.insert(row, style);
                }
            }
        }
        b"col" => {
            let (Some(min), Some(max)) = (attr_num::<u32>(e, b"min"), attr_num::<u32>(e, b"max")) else {
                return;
            };
            let width = attr_num::<f64>(e, b"width").filter(|_| attr_flag(e, b"customWidth"));
            let style = attr_num::<usize>(e, b"style").filter(|s| *s > 0);
            for col in min..=max.min(MAX_COLUMNS) {
                if let Some(width) = width {
                    layout.col_widths.insert(col, character_width(width));
                }
                if let Some(style) = style {
                    layout.col_styles.insert(col, style);
                }
            }
        }
        b"mergeCell" => {
            if let Some(range) = attr(e, b"ref").and_then(|r| CellRange::parse(&r).ok()) {
                layout.merges.push(range);
            }
        }
        _ => {}
    });
    layout
}

/// Excel's last column (XFD).
pub const MAX_COLUMNS: u32 = 16_384;

/// Excel's last row.
pub const MAX_ROWS: u32 = 1_048_576;

/// Stored `<col width>` values include five pixels of cell padding at a
/// seven pixel digit width (Calibri 11); rust_xlsxwriter adds it back.
fn character_width(stored: f64) -> f64 {
    const DIGIT: f64 = 7.0;
    const PADDING: f64 = 5.0;
    let pixels = (stored * DIGIT).round();
    if pixels >= DIGIT + PADDING {
        (pixels - PADDING) / DIGIT
    } else {
        pixels / (DIGIT + PADDING)
    }
}

// ============================================================================
// XML helpers
// ============================================================================

/// Call `f` for every start and empty element of `xml`.
fn for_each_element(xml: &str, mut f: impl FnMut(&BytesStart)) {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => f(e),
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
}

/// Attribute value with XML entities resolved.
fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    let attribute = e.attributes().flatten().find(|a| a.key.as_ref() == key)?;
    let raw = String::from_utf8_lossy(&attribute.value);
    Some(match unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.into_owned(),
    })
}

fn attr_num<T: std::str::FromStr>(e: &BytesStart, key: &[u8]) -> Option<T> {
    attr(e, key).and_then(|v| v.trim().parse().ok())
}

fn attr_flag(e: &BytesStart, key: &[u8]) -> bool {
    matches!(attr(e, key).as_deref(), Some("1") | Some("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy&quot;年&quot;m&quot;月&quot;d&quot;日&quot;"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="ＭＳ Ｐゴシック"/></font>
    <font><b/><sz val="14"/><color rgb="FFFF0000"/><name val="ＭＳ ゴシック"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor theme="0" tint="-0.5"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color indexed="64"/></left><right style="medium"/><top style="double"><color rgb="FF0000FF"/></top><bottom/><diagonal/></border>
  </borders>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="164" fontId="1" fillId="2" borderId="1" applyNumberFormat="1"><alignment horizontal="center" vertical="center" wrapText="1"/></xf>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="49" fontId="0" fillId="1" borderId="0"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn styles_resolve_fonts_fills_borders_and_formats() {
        let styles = parse_styles_xml(STYLES);
        assert_eq!(styles.len(), 4);

        assert_eq!(styles[0].font_name.as_deref(), Some("ＭＳ Ｐゴシック"));
        assert_eq!(styles[0].font_color, Some(0x000000));
        assert_eq!(styles[0].number_format, None);

        let header = &styles[1];
        assert!(header.bold);
        assert_eq!(header.font_size, Some(14.0));
        assert_eq!(header.font_color, Some(0xFF0000));
        assert_eq!(header.fill, Some(0x808080));
        assert_eq!(header.left, BorderSide { line: BorderLine::Thin, color: Some(0x000000) });
        assert_eq!(header.right.line, BorderLine::Medium);
        assert_eq!(header.top, BorderSide { line: BorderLine::Double, color: Some(0x0000FF) });
        assert_eq!(header.bottom.line, BorderLine::None);
        assert_eq!(
            header.number_format,
            Some(NumberFormat::Custom("yyyy\"年\"m\"月\"d\"日\"".to_string()))
        );
        assert_eq!(header.horizontal, Some(HAlign::Center));
        assert_eq!(header.vertical, Some(VAlign::Center));
        assert!(header.wrap);

        assert_eq!(styles[2].number_format, Some(NumberFormat::Builtin(14)));
        // Non-solid patterns are not carried
        assert_eq!(styles[3].fill, None);
        assert_eq!(styles[3].number_format, Some(NumberFormat::Builtin(49)));
    }

    #[test]
    fn sheet_layout_reads_dimensions_styles_and_merges() {
        let xml = r#"<worksheet>
  <cols>
    <col min="2" max="3" width="40.7109375" customWidth="1"/>
    <col min="4" max="4" width="9.140625" style="2"/>
  </cols>
  <sheetData>
    <row r="1" ht="30" customHeight="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1" s="1"/></row>
    <row r="3" s="3" customFormat="1"><c r="A3" s="2"><v>45000</v></c><c r="B3"><v>1</v></c></row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A1:D1"/></mergeCells>
</worksheet>"#;
        let layout = parse_sheet_layout(xml);

        let a = |s: &str| Address::parse(s).unwrap();
        assert_eq!(layout.cell_styles.get(&a("A1")), Some(&1));
        assert_eq!(layout.cell_styles.get(&a("B1")), Some(&1));
        assert_eq!(layout.cell_styles.get(&a("A3")), Some(&2));
        assert!(!layout.cell_styles.contains_key(&a("B3")));

        assert_eq!(layout.col_widths.get(&2), Some(&40.0));
        assert_eq!(layout.col_widths.get(&3), Some(&40.0));
        // No customWidth: the width is the default and not recorded
        assert!(!layout.col_widths.contains_key(&4));
        assert_eq!(layout.col_styles.get(&4), Some(&2));

        assert_eq!(layout.row_heights.get(&1), Some(&30.0));
        assert!(!layout.row_heights.contains_key(&3));
        assert_eq!(layout.row_styles.get(&3), Some(&3));

        assert_eq!(layout.merges, vec![CellRange::parse("A1:D1").unwrap()]);
    }

    #[test]
    fn worksheet_parts_follow_relationships() {
        let workbook = r#"<workbook><sheets>
  <sheet name="登録申請書" sheetId="1" r:id="rId2"/>
  <sheet name="概要" sheetId="2" r:id="rId1"/>
</sheets></workbook>"#;
        let rels = r#"<Relationships>
  <Relationship Id="rId1" Target="worksheets/sheet2.xml"/>
  <Relationship Id="rId2" Target="/xl/worksheets/sheet1.xml"/>
</Relationships>"#;
        let names = vec!["概要".to_string(), "登録申請書".to_string(), "absent".to_string()];
        assert_eq!(
            worksheet_parts(workbook, rels, &names),
            vec![
                Some("xl/worksheets/sheet2.xml".to_string()),
                Some("xl/worksheets/sheet1.xml".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn tint_scales_channels() {
        assert_eq!(apply_tint(0xFFFFFF, -0.5), 0x808080);
        assert_eq!(apply_tint(0x000000, 0.5), 0x808080);
        assert_eq!(parse_argb("FF00B050"), Some(0x00B050));
        assert_eq!(indexed_color(10), Some(0xFF0000));
    }

    #[test]
    fn character_width_inverts_padding() {
        assert_eq!(character_width(40.7109375), 40.0);
        assert_eq!(character_width(9.140625), 59.0 / 7.0);
        assert_eq!(character_width(1.0), 7.0 / 12.0);
    }
}
