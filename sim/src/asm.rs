//! Assembler of the text format describing a processing element: its weight
//! table and its descriptor program.
use anyhow::{bail, Context};
use pest::Parser;
use pest_derive::Parser;

use crate::{
    object::PeImage,
    sequencer::{Descriptor, DescriptorState, RawDescriptor, Weight},
    utils::parse_literal,
};

#[derive(Parser)]
#[grammar = "grammar.pest"] // relative to src
struct PeAsmParser;

#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOption {
    verbose: bool,
}

impl AssembleOption {
    /// Print every assembled line to stderr.
    pub fn set_verbose(self, verbose: bool) -> Self {
        Self { verbose }
    }
}

fn parse_int<T: TryFrom<i64>>(pair: pest::iterators::Pair<'_, Rule>) -> anyhow::Result<T> {
    let s = pair.as_str();
    let Some(v) = parse_literal(s) else {
        bail!("invalid literal `{s}`")
    };
    T::try_from(v).map_err(|_| anyhow::anyhow!("literal `{s}` out of range"))
}

fn parse_descriptor(pair: pest::iterators::Pair<'_, Rule>) -> anyhow::Result<Descriptor> {
    let mut it = pair.into_inner();
    let Some(head) = it.next() else {
        bail!("missing descriptor state")
    };
    let state = match head.as_rule() {
        Rule::raw => {
            let tag = head.into_inner().next().context("missing state tag")?;
            parse_int::<u8>(tag)?
        }
        _ => match head.as_str() {
            "genwait" => DescriptorState::GenWait.code(),
            "wait" => DescriptorState::Wait.code(),
            "suspend" => DescriptorState::Suspended.code(),
            s => bail!("unknown descriptor state `{s}`"),
        },
    };

    let (mut x, mut y, mut m) = (None, None, None);
    for field in it {
        let mut kv = field.into_inner();
        let (Some(name), Some(val)) = (kv.next(), kv.next()) else {
            bail!("malformed field")
        };
        let slot_set = match name.as_str() {
            "x" => x.replace(parse_int::<u32>(val)?).is_some(),
            "y" => y.replace(parse_int::<u32>(val)?).is_some(),
            "m" => m.replace(parse_int::<i64>(val)?).is_some(),
            s => bail!("unknown field `{s}`"),
        };
        if slot_set {
            bail!("field `{}` given twice", name.as_str());
        }
    }

    let raw = RawDescriptor {
        state,
        x_count: x.unwrap_or(0),
        y_count: y.unwrap_or(0),
        y_modify: m.unwrap_or(0),
    };
    Ok(Descriptor::try_from(raw)?)
}

/// Assemble a processing element image from its source.
pub fn assemble(src: &str, option: AssembleOption) -> anyhow::Result<PeImage> {
    let main = PeAsmParser::parse(Rule::main, src)
        .context("syntax error")?
        .next()
        .context("empty parse tree")?;

    let mut image = PeImage::default();
    for line in main.into_inner().filter(|l| l.as_rule() == Rule::line) {
        let (line_no, _) = line.line_col();
        let text = line.as_str().trim().to_string();
        let Some(item) = line.into_inner().next() else {
            continue;
        };
        match item.as_rule() {
            Rule::weights => {
                let n = image.weights.len();
                for val in item.into_inner() {
                    let w = parse_int::<Weight>(val).with_context(|| format!("line {line_no}"))?;
                    image.weights.push(w);
                }
                if option.verbose {
                    eprintln!("{line_no:>4}: {text:<40} weights[{n}..{}]", image.weights.len());
                }
            }
            Rule::descriptor => {
                let desc = parse_descriptor(item).with_context(|| format!("line {line_no}"))?;
                if option.verbose {
                    eprintln!("{line_no:>4}: {text:<40} desc[{}] {:?}", image.program.len(), desc);
                }
                image.program.push(desc);
            }
            _ => unreachable!(),
        }
    }
    tracing::debug!(
        "assembled {} weights, {} descriptors",
        image.weights.len(),
        image.program.len()
    );
    Ok(image)
}
