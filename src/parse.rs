use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use indexmap::IndexMap;
use lopdf::content::Operation;
use lopdf::{
    Dictionary, Document, Encoding, Error as LopdfError, Object, ObjectId,
    Result as LopdfResult,
};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::error::OutlineError;

/// Fraction of the font size used as the ascent above the baseline.
const ASCENT_RATIO: f32 = 0.8;
/// Fraction of the font size used as the descent below the baseline.
const DESCENT_RATIO: f32 = 0.2;
/// Average glyph advance as a fraction of the font size. Good enough for
/// line grouping and centering; exact AFM widths are not needed here.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// A decoded text run from a page content stream.
///
/// The bounding box is in top-down page coordinates: `bbox.1` is the top
/// edge and y grows toward the bottom of the page. `font_size` is the
/// effective rendered size (the Tf size scaled by the text matrix).
#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub text: String,
    pub font_size: f32,
    pub font_name: Option<String>,
    pub bold: bool,
    pub page: u32,
    /// (x_min, y_min, x_max, y_max)
    pub bbox: (f32, f32, f32, f32),
}

/// One entry of a document's own outline tree, depth-first order.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedHeading {
    /// 1-based depth in the outline tree.
    pub level: u32,
    pub title: String,
    pub page: u32,
}

pub fn load_document(path: &Path) -> Result<Document, OutlineError> {
    Document::load(path).map_err(OutlineError::DocumentOpen)
}

pub fn load_document_mem(bytes: &[u8]) -> Result<Document, OutlineError> {
    Document::load_mem(bytes).map_err(OutlineError::DocumentOpen)
}

/// Width and height of the first page, or a letter-sized default when the
/// document has no pages.
pub fn page_dimensions(doc: &Document) -> (f32, f32) {
    let rect = doc
        .get_pages()
        .values()
        .next()
        .map(|&page_id| media_box(doc, page_id))
        .unwrap_or(DEFAULT_MEDIA_BOX);
    (rect[2] - rect[0], rect[3] - rect[1])
}

const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Extracts every page's text runs. A page whose content stream cannot be
/// decoded is skipped with a warning; extraction failure is only fatal to
/// the document when lopdf cannot open it at all.
pub fn get_document_text(doc: &Document) -> BTreeMap<u32, Vec<TextElement>> {
    let mut pages_map = BTreeMap::new();
    for (page_num, page_id) in doc.get_pages() {
        match get_page_text_elements(doc, page_num, page_id) {
            Ok(elements) => {
                pages_map.insert(page_num, elements);
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "failed to extract page text");
            }
        }
    }
    pages_map
}

#[derive(Clone, Debug)]
struct GraphicsState<'a> {
    ctm: [f32; 6],
    text: TextState<'a>,
}

impl<'a> Default for GraphicsState<'a> {
    fn default() -> Self {
        GraphicsState {
            ctm: IDENTITY,
            text: TextState::default(),
        }
    }
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

#[derive(Clone, Debug)]
struct TextState<'a> {
    text_matrix: [f32; 6],      // Tm
    text_line_matrix: [f32; 6], // Tlm
    font_name: Option<String>,
    font_size: f32,
    bold: bool,
    character_spacing: f32,  // Tc
    word_spacing: f32,       // Tw
    horizontal_scaling: f32, // Tz, as a fraction (1.0 = 100%)
    leading: f32,            // TL
    rise: f32,               // Ts
    encoding: Option<&'a Encoding<'a>>,
}

impl<'a> Default for TextState<'a> {
    fn default() -> Self {
        TextState {
            text_matrix: IDENTITY,
            text_line_matrix: IDENTITY,
            font_name: None,
            font_size: 0.0,
            bold: false,
            character_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
            encoding: None,
        }
    }
}

fn multiply_matrices(a: &[f32; 6], b: &[f32; 6]) -> [f32; 6] {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn translate_matrix(x: f32, y: f32) -> [f32; 6] {
    [1.0, 0.0, 0.0, 1.0, x, y]
}

fn apply_matrix(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn operand_as_float(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(f) => *f,
        _ => 0.0,
    }
}

fn matrix_from_operands(op: &Operation) -> [f32; 6] {
    op.operands
        .iter()
        .map(operand_as_float)
        .collect::<Vec<f32>>()
        .try_into()
        .unwrap_or(IDENTITY)
}

/// Strips a subset prefix ("ABCDEF+Helvetica-Bold" -> "Helvetica-Bold").
fn base_font_name(dict: &Dictionary) -> Option<String> {
    dict.get(b"BaseFont")
        .and_then(Object::as_name)
        .ok()
        .map(|name| {
            let name = String::from_utf8_lossy(name);
            name.rsplit('+').next().unwrap_or(&name).to_string()
        })
}

fn is_bold_font(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("bold") || name.contains("black") || name.contains("heavy")
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    // MediaBox is inheritable: walk the Parent chain until one is found.
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_dictionary(id) else { break };
        if let Ok(arr) = dict.get(b"MediaBox").and_then(Object::as_array) {
            let mut rect = DEFAULT_MEDIA_BOX;
            for (i, obj) in arr.iter().take(4).enumerate() {
                rect[i] = operand_as_float(obj);
            }
            return rect;
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    DEFAULT_MEDIA_BOX
}

/// Accumulates the glyphs of one show operation into a text run.
struct RunBuilder {
    text: String,
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
}

impl RunBuilder {
    fn new() -> Self {
        RunBuilder {
            text: String::new(),
            x_min: f32::MAX,
            y_min: f32::MAX,
            x_max: f32::MIN,
            y_max: f32::MIN,
        }
    }

    fn add_glyph(&mut self, ch: char, device_pos: (f32, f32), width: f32, size: f32) {
        self.text.push(ch);
        let (x, y) = device_pos;
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x + width);
        self.y_min = self.y_min.min(y - DESCENT_RATIO * size);
        self.y_max = self.y_max.max(y + ASCENT_RATIO * size);
    }

    /// Flips the accumulated box into top-down page coordinates.
    fn finish(self, state: &TextState, size: f32, page: u32, page_top: f32) -> Option<TextElement> {
        if self.text.trim().is_empty() {
            return None;
        }
        Some(TextElement {
            text: self.text,
            font_size: size,
            font_name: state.font_name.clone(),
            bold: state.bold,
            page,
            bbox: (
                self.x_min,
                page_top - self.y_max,
                self.x_max,
                page_top - self.y_min,
            ),
        })
    }
}

/// Walks a show operation's operands, advancing the pen through text space
/// and projecting each glyph into device space.
fn collect_text_run(
    state: &TextState,
    pen_x: &mut f32,
    operands: &[Object],
    trm: &[f32; 6],
    run: &mut RunBuilder,
) -> LopdfResult<()> {
    let encoding = state.encoding.ok_or(LopdfError::CharacterEncoding)?;
    let vertical_scale = (trm[1] * trm[1] + trm[3] * trm[3]).sqrt();
    let size = state.font_size * vertical_scale;

    for operand in operands {
        match operand {
            Object::String(bytes, _) => {
                let decoded: String = Document::decode_text(encoding, bytes)?.nfc().collect();
                for ch in decoded.chars() {
                    let (x, y) = apply_matrix(trm, *pen_x, state.rise);
                    let mut advance =
                        AVG_GLYPH_WIDTH * state.font_size + state.character_spacing;
                    if ch == ' ' {
                        advance += state.word_spacing;
                    }
                    advance *= state.horizontal_scaling;
                    run.add_glyph(ch, (x, y), advance * vertical_scale, size);
                    *pen_x += advance;
                }
            }
            Object::Integer(i) => {
                *pen_x -= *i as f32 * state.font_size / 1000.0;
            }
            Object::Real(f) => {
                *pen_x -= *f * state.font_size / 1000.0;
            }
            Object::Array(arr) => {
                collect_text_run(state, pen_x, arr, trm, run)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn next_line(state: &mut TextState, tx: f32, ty: f32) {
    let tm = multiply_matrices(&translate_matrix(tx, ty), &state.text_line_matrix);
    state.text_matrix = tm;
    state.text_line_matrix = tm;
}

fn handle_operator<'a>(
    gs_stack: &mut Vec<GraphicsState<'a>>,
    op: &Operation,
    collected: &mut Vec<TextElement>,
    page: u32,
    page_top: f32,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    encodings: &'a BTreeMap<Vec<u8>, Encoding<'a>>,
) -> LopdfResult<()> {
    match op.operator.as_ref() {
        "q" => {
            let current = gs_stack.last().cloned().unwrap_or_default();
            gs_stack.push(current);
        }
        "Q" => {
            if gs_stack.len() > 1 {
                gs_stack.pop();
            }
        }
        "cm" => {
            let matrix = matrix_from_operands(op);
            let gs = gs_stack.last_mut().unwrap();
            gs.ctm = multiply_matrices(&matrix, &gs.ctm);
        }
        "BT" => {
            let text = &mut gs_stack.last_mut().unwrap().text;
            text.text_matrix = IDENTITY;
            text.text_line_matrix = IDENTITY;
        }
        "ET" => {
            let text = &mut gs_stack.last_mut().unwrap().text;
            text.text_matrix = IDENTITY;
            text.text_line_matrix = IDENTITY;
        }
        "Tf" => {
            if let (Some(Object::Name(font_key)), Some(size_obj)) =
                (op.operands.first(), op.operands.get(1))
            {
                let text = &mut gs_stack.last_mut().unwrap().text;
                text.font_size = operand_as_float(size_obj);
                if let Some(dict) = fonts.get(font_key) {
                    let base = base_font_name(dict);
                    text.bold = base.as_deref().is_some_and(is_bold_font);
                    text.font_name = base;
                }
                text.encoding = encodings.get(font_key);
            }
        }
        "Tc" => {
            if let Some(obj) = op.operands.first() {
                gs_stack.last_mut().unwrap().text.character_spacing = operand_as_float(obj);
            }
        }
        "Tw" => {
            if let Some(obj) = op.operands.first() {
                gs_stack.last_mut().unwrap().text.word_spacing = operand_as_float(obj);
            }
        }
        "Tz" => {
            if let Some(obj) = op.operands.first() {
                gs_stack.last_mut().unwrap().text.horizontal_scaling =
                    operand_as_float(obj) / 100.0;
            }
        }
        "TL" => {
            if let Some(obj) = op.operands.first() {
                gs_stack.last_mut().unwrap().text.leading = operand_as_float(obj);
            }
        }
        "Ts" => {
            if let Some(obj) = op.operands.first() {
                gs_stack.last_mut().unwrap().text.rise = operand_as_float(obj);
            }
        }
        "Tm" => {
            let m = matrix_from_operands(op);
            let text = &mut gs_stack.last_mut().unwrap().text;
            text.text_matrix = m;
            text.text_line_matrix = m;
        }
        "Td" => {
            if let (Some(tx), Some(ty)) = (op.operands.first(), op.operands.get(1)) {
                let text = &mut gs_stack.last_mut().unwrap().text;
                next_line(text, operand_as_float(tx), operand_as_float(ty));
            }
        }
        "TD" => {
            if let (Some(tx), Some(ty)) = (op.operands.first(), op.operands.get(1)) {
                let (tx, ty) = (operand_as_float(tx), operand_as_float(ty));
                let text = &mut gs_stack.last_mut().unwrap().text;
                text.leading = -ty;
                next_line(text, tx, ty);
            }
        }
        "T*" => {
            let text = &mut gs_stack.last_mut().unwrap().text;
            let leading = text.leading;
            next_line(text, 0.0, -leading);
        }
        "Tj" | "TJ" | "'" | "\"" => {
            let gs = gs_stack.last_mut().unwrap();

            // ' and " move to the next line before showing; " also carries
            // word and character spacing as its first two operands.
            let operands: &[Object] = match op.operator.as_ref() {
                "'" => {
                    let leading = gs.text.leading;
                    next_line(&mut gs.text, 0.0, -leading);
                    &op.operands
                }
                "\"" => {
                    if op.operands.len() == 3 {
                        gs.text.word_spacing = operand_as_float(&op.operands[0]);
                        gs.text.character_spacing = operand_as_float(&op.operands[1]);
                    }
                    let leading = gs.text.leading;
                    next_line(&mut gs.text, 0.0, -leading);
                    &op.operands[op.operands.len().saturating_sub(1)..]
                }
                _ => &op.operands,
            };

            if gs.text.encoding.is_some() {
                let trm = multiply_matrices(&gs.text.text_matrix, &gs.ctm);
                let vertical_scale = (trm[1] * trm[1] + trm[3] * trm[3]).sqrt();
                let size = gs.text.font_size * vertical_scale;

                let mut run = RunBuilder::new();
                let mut pen_x = 0.0;
                collect_text_run(&gs.text, &mut pen_x, operands, &trm, &mut run)?;
                collected.extend(run.finish(&gs.text, size, page, page_top));

                // Advance the text matrix past the shown text so successive
                // show operations on one line do not stack on each other.
                let advance = translate_matrix(pen_x, 0.0);
                gs.text.text_matrix = multiply_matrices(&advance, &gs.text.text_matrix);
            }
        }
        _ => {}
    }
    Ok(())
}

fn get_page_text_elements(
    doc: &Document,
    page: u32,
    page_id: ObjectId,
) -> LopdfResult<Vec<TextElement>> {
    let content = doc.get_and_decode_page_content(page_id)?;
    let page_top = media_box(doc, page_id)[3];

    let fonts = doc.get_page_fonts(page_id)?;
    let encodings: BTreeMap<Vec<u8>, Encoding> = fonts
        .iter()
        .filter_map(|(name, font)| match font.get_font_encoding(doc) {
            Ok(encoding) => Some((name.clone(), encoding)),
            Err(e) => {
                warn!(page, font = %String::from_utf8_lossy(name), error = %e,
                    "unsupported font encoding, skipping its text");
                None
            }
        })
        .collect();

    let mut elements = Vec::new();
    let mut gs_stack = vec![GraphicsState::default()];

    for op in &content.operations {
        handle_operator(
            &mut gs_stack,
            op,
            &mut elements,
            page,
            page_top,
            &fonts,
            &encodings,
        )?;
    }

    debug!(page, runs = elements.len(), "extracted text runs");
    Ok(elements)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj.as_reference() {
        Ok(id) => doc.get_object(id).unwrap_or(obj),
        Err(_) => obj,
    }
}

/// Decodes a PDF text string: UTF-16BE when it carries a BOM, otherwise
/// treated as Latin-1.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&utf16)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Named destinations from the catalog's `/Dests` dictionary.
fn named_destinations(doc: &Document) -> IndexMap<String, Object> {
    let mut destinations = IndexMap::new();
    let Ok(catalog) = doc.catalog() else {
        return destinations;
    };
    if let Ok(dict) = catalog
        .get(b"Dests")
        .map(|obj| resolve(doc, obj))
        .and_then(Object::as_dict)
    {
        for (key, value) in dict.iter() {
            destinations.insert(
                String::from_utf8_lossy(key).to_string(),
                resolve(doc, value).to_owned(),
            );
        }
    }
    destinations
}

fn destination_page(
    doc: &Document,
    dest: &Object,
    pages: &HashMap<ObjectId, u32>,
    named: &IndexMap<String, Object>,
) -> Option<u32> {
    match dest {
        Object::Array(arr) => arr
            .first()
            .and_then(|obj| obj.as_reference().ok())
            .and_then(|id| pages.get(&id).copied()),
        Object::Dictionary(dict) => {
            let inner = dict.get(b"D").ok().map(|obj| resolve(doc, obj))?;
            destination_page(doc, inner, pages, named)
        }
        Object::Name(name) => {
            let target = named.get(String::from_utf8_lossy(name).as_ref())?;
            destination_page(doc, target, pages, named)
        }
        Object::String(bytes, _) => {
            let target = named.get(decode_pdf_string(bytes).as_str())?;
            destination_page(doc, target, pages, named)
        }
        _ => None,
    }
}

fn item_page(
    doc: &Document,
    item: &Dictionary,
    pages: &HashMap<ObjectId, u32>,
    named: &IndexMap<String, Object>,
) -> Option<u32> {
    if let Ok(dest) = item.get(b"Dest") {
        return destination_page(doc, resolve(doc, dest), pages, named);
    }
    let action = item.get(b"A").map(|obj| resolve(doc, obj)).ok()?;
    let target = action.as_dict().ok()?.get(b"D").ok()?;
    destination_page(doc, resolve(doc, target), pages, named)
}

const MAX_OUTLINE_ITEMS: usize = 10_000;
const MAX_OUTLINE_DEPTH: u32 = 32;

fn walk_outline_level(
    doc: &Document,
    parent: &Dictionary,
    depth: u32,
    pages: &HashMap<ObjectId, u32>,
    named: &IndexMap<String, Object>,
    out: &mut Vec<EmbeddedHeading>,
) {
    if depth > MAX_OUTLINE_DEPTH {
        return;
    }

    let mut item = parent
        .get(b"First")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok());

    while let Some(node) = item {
        if out.len() >= MAX_OUTLINE_ITEMS {
            return;
        }

        let title = node
            .get(b"Title")
            .ok()
            .and_then(|obj| match resolve(doc, obj) {
                Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
                _ => None,
            })
            .unwrap_or_default();

        let page = item_page(doc, node, pages, named).unwrap_or(1);
        out.push(EmbeddedHeading {
            level: depth,
            title,
            page,
        });

        walk_outline_level(doc, node, depth + 1, pages, named, out);

        item = node
            .get(b"Next")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_dict().ok());
    }
}

/// Reads the document's own outline tree from the catalog, depth-first.
/// Returns an empty list when the document carries none.
pub fn get_embedded_outline(doc: &Document) -> Vec<EmbeddedHeading> {
    let mut entries = Vec::new();
    let Ok(catalog) = doc.catalog() else {
        return entries;
    };
    let Ok(outlines) = catalog
        .get(b"Outlines")
        .map(|obj| resolve(doc, obj))
        .and_then(Object::as_dict)
    else {
        return entries;
    };

    let pages: HashMap<ObjectId, u32> = doc
        .get_pages()
        .into_iter()
        .map(|(num, id)| (id, num))
        .collect();
    let named = named_destinations(doc);

    walk_outline_level(doc, outlines, 1, &pages, &named, &mut entries);
    debug!(entries = entries.len(), "walked embedded outline");
    entries
}
