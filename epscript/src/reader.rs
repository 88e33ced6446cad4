//! Read EPS documents: strip the DOS binary header, find the bounding box
//! and interpret the PostScript part.

use crate::{
    graphics::{trans::PageRect, GraphicGroup},
    interpret,
    parser::Tokenizer,
    MachineError, MachineOption, MachineOptionBuilder,
};
use anyhow::{anyhow, bail, Context, Result as AnyResult};
use log::{info, warn};
use winnow::{binary::le_u32, token::literal, PResult, Parser};

/// Magic of the binary header of DOS EPS files.
const DOS_EPS_MAGIC: [u8; 4] = [0xc5, 0xd0, 0xd3, 0xc6];

/// Interpreted EPS document.
#[derive(Debug)]
pub struct EpsDocument {
    /// Bounding box declared by the document, or the default page.
    pub bounding_box: PageRect,
    /// Language level the document was interpreted at.
    pub level: u8,
    pub graphic: GraphicGroup,
}

/// PostScript section of `data`. Files with a DOS EPS header carry the
/// PostScript offset and length in it, other files are returned as is.
pub fn postscript_section(data: &[u8]) -> AnyResult<&[u8]> {
    if !data.starts_with(&DOS_EPS_MAGIC) {
        return Ok(data);
    }
    let mut input = data;
    let header: PResult<(&[u8], u32, u32)> =
        (literal(&DOS_EPS_MAGIC[..]), le_u32, le_u32).parse_next(&mut input);
    let (_, offset, len) = header.map_err(|_| anyhow!("truncated DOS EPS header"))?;
    let start = usize::try_from(offset)?;
    let end = start
        .checked_add(usize::try_from(len)?)
        .context("DOS EPS section overflows")?;
    data.get(start..end)
        .with_context(|| format!("DOS EPS section {start}..{end} out of file"))
}

fn parse_box(s: &str) -> Option<PageRect> {
    let v: Vec<f64> = s
        .split_ascii_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    let [x0, y0, x1, y1] = v[..] else {
        return None;
    };
    let r = PageRect::new((x0.min(x1), y0.min(y1)).into(), (x0.max(x1), y0.max(y1)).into());
    (!r.is_empty()).then_some(r)
}

/// Bounding box from DSC comments, `%%HiResBoundingBox` is preferred over
/// `%%BoundingBox`. `(atend)` values are skipped, the trailer one is used.
pub fn bounding_box(ps: &[u8]) -> Option<PageRect> {
    let text = String::from_utf8_lossy(ps);
    let find = |prefix: &str| {
        text.lines()
            .filter_map(|l| l.strip_prefix(prefix))
            .find_map(parse_box)
    };
    find("%%HiResBoundingBox:").or_else(|| find("%%BoundingBox:"))
}

/// Interpret an EPS document. On failure the document is interpreted again
/// at each lower language level, the first success is returned. Running out
/// of operations or nesting depth ends the attempt without retrying.
pub fn read_eps(data: &[u8], option: MachineOption) -> AnyResult<EpsDocument> {
    let ps = postscript_section(data)?;
    let bbox = bounding_box(ps);
    if bbox.is_none() {
        info!("no bounding box, use default page");
    }
    let mut builder = MachineOptionBuilder::from(option);
    if let Some(bbox) = bbox {
        builder = builder.page_box(bbox);
    }
    let option = builder.build();

    let mut last_error = None;
    for level in (1..=option.level()).rev() {
        let option = MachineOptionBuilder::from(option.clone()).level(level).build();
        let bounding_box = option.page_box();
        match interpret(option, &mut Tokenizer::new(ps)) {
            Ok(graphic) => {
                return Ok(EpsDocument {
                    bounding_box,
                    level,
                    graphic,
                })
            }
            Err(e) => {
                warn!("interpret at language level {level} failed: {e}");
                let exhausted = matches!(
                    e,
                    MachineError::ExecutionLimitExceeded(_) | MachineError::RecursionTooDeep(_)
                );
                last_error = Some(e);
                if exhausted {
                    break;
                }
            }
        }
    }
    match last_error {
        Some(e) => Err(e).context("interpret EPS document"),
        None => bail!("no language level to interpret at"),
    }
}
