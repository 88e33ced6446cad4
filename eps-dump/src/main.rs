use anyhow::{Context, Result as AnyResult};
use clap::{arg, value_parser, Command};
use epscript::{
    graphics::{Brush, GraphicGroup, GraphicNode, GraphicPath, PathSegment},
    read_eps, MachineOptionBuilder,
};
use log::info;
use mimalloc::MiMalloc;
use std::{
    io::{stdout, BufWriter, Write},
    path::PathBuf,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn cli() -> Command {
    Command::new("eps-dump")
        .about("Interpret EPS file and dump the graphic tree")
        .arg(
            arg!(<filename> "EPS file to dump")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            arg!(--level <level> "PostScript language level, 1 to 3, default: 3")
                .value_parser(value_parser!(u8)),
        )
        .arg(
            arg!(--"max-ops" <count> "Abort after <count> operations")
                .value_parser(value_parser!(u64)),
        )
        .arg(arg!(--summary "Print node counts and color precision only"))
}

struct DumpArgs<'a> {
    path: &'a PathBuf,
    level: Option<u8>,
    max_ops: Option<u64>,
    summary: bool,
}

#[derive(Debug, Default)]
struct Summary {
    groups: usize,
    clipped: usize,
    paths: usize,
    fills: usize,
    strokes: usize,
}

impl Summary {
    fn collect(g: &GraphicGroup) -> Self {
        let mut r = Self::default();
        r.visit(g);
        r
    }

    fn visit(&mut self, g: &GraphicGroup) {
        for node in &g.children {
            match node {
                GraphicNode::Group(g) => {
                    self.groups += 1;
                    if g.clip.is_some() {
                        self.clipped += 1;
                    }
                    self.visit(g);
                }
                GraphicNode::Path(p) => {
                    self.paths += 1;
                    self.fills += usize::from(p.fill.is_some());
                    self.strokes += usize::from(p.stroke.is_some());
                }
            }
        }
    }
}

fn brush_text(b: &Brush) -> String {
    match b {
        Brush::Solid(c) => {
            let [r, g, b] = c.to_bytes();
            format!("#{r:02x}{g:02x}{b:02x}")
        }
        Brush::LinearGradient { stops, .. } => format!("linear gradient, {} stops", stops.len()),
        Brush::RadialGradient { stops, .. } => format!("radial gradient, {} stops", stops.len()),
        Brush::Tile { content, step, .. } => format!(
            "tile {}x{}, {} paths",
            step.0,
            step.1,
            content.paths().count()
        ),
    }
}

fn dump_path(w: &mut impl Write, p: &GraphicPath, indent: usize) -> AnyResult<()> {
    let pad = "  ".repeat(indent);
    write!(w, "{pad}path {:?}", p.precision)?;
    if let Some(fill) = &p.fill {
        write!(w, " fill={} {:?}", brush_text(fill), p.geometry.fill_rule())?;
    }
    if let Some(stroke) = &p.stroke {
        write!(w, " stroke={} width={}", brush_text(&stroke.brush), stroke.width)?;
    }
    writeln!(w)?;
    for seg in p.geometry.segments() {
        match seg {
            PathSegment::MoveTo(p) => writeln!(w, "{pad}  M {:.2} {:.2}", p.x, p.y)?,
            PathSegment::LineTo(p) => writeln!(w, "{pad}  L {:.2} {:.2}", p.x, p.y)?,
            PathSegment::CurveTo(p1, p2, p3) => writeln!(
                w,
                "{pad}  C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                p1.x, p1.y, p2.x, p2.y, p3.x, p3.y
            )?,
            PathSegment::ClosePath => writeln!(w, "{pad}  Z")?,
        }
    }
    Ok(())
}

fn dump_group(w: &mut impl Write, g: &GraphicGroup, indent: usize) -> AnyResult<()> {
    for node in &g.children {
        match node {
            GraphicNode::Group(g) => {
                let pad = "  ".repeat(indent);
                write!(w, "{pad}group")?;
                if let Some(bounds) = g.clip.as_ref().and_then(|c| c.bounds()) {
                    write!(
                        w,
                        " clip=[{:.2} {:.2} {:.2} {:.2}]",
                        bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y
                    )?;
                }
                if g.opacity < 1.0 {
                    write!(w, " opacity={}", g.opacity)?;
                }
                writeln!(w)?;
                dump_group(w, g, indent + 1)?;
            }
            GraphicNode::Path(p) => dump_path(w, p, indent)?,
        }
    }
    Ok(())
}

fn dump(args: DumpArgs) -> AnyResult<()> {
    let data = std::fs::read(args.path)
        .with_context(|| format!("read {}", args.path.display()))?;
    let mut option = MachineOptionBuilder::new().max_operations(args.max_ops);
    if let Some(level) = args.level {
        option = option.level(level);
    }
    let doc = read_eps(&data, option.build())?;
    info!("interpreted at language level {}", doc.level);

    let mut w = BufWriter::new(stdout().lock());
    let b = doc.bounding_box;
    writeln!(
        w,
        "bbox: [{} {} {} {}], level: {}",
        b.min.x, b.min.y, b.max.x, b.max.y, doc.level
    )?;
    if args.summary {
        let s = Summary::collect(&doc.graphic);
        writeln!(
            w,
            "groups: {} ({} clipped), paths: {} ({} filled, {} stroked)",
            s.groups, s.clipped, s.paths, s.fills, s.strokes
        )?;
        writeln!(w, "precision: {:?}", doc.graphic.precision())?;
    } else {
        dump_group(&mut w, &doc.graphic, 0)?;
    }
    w.flush()?;
    Ok(())
}

fn main() -> AnyResult<()> {
    env_logger::init();

    let m = cli().get_matches();
    dump(DumpArgs {
        path: m
            .get_one::<PathBuf>("filename")
            .context("missing file name")?,
        level: m.get_one::<u8>("level").copied(),
        max_ops: m.get_one::<u64>("max-ops").copied(),
        summary: m.get_flag("summary"),
    })
}
