//! Cleaned MusicXML output
//!
//! Streams the original document back out with quick-xml, applying only the
//! repairs the normalizer recorded. Everything the normalizer did not touch is
//! copied through event by event, so formatting and elements the validators
//! never read survive unchanged.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fmt::Display;

use crate::errors::MalformedDocument;
use crate::normalize::RepairPlan;

/// What to do with a start or empty element
enum Action {
    Keep,
    Drop,
    Renumber(u32),
}

/// Rewrite `xml` according to `plan`. An empty plan returns the input as is.
pub fn apply_repairs(xml: &str, plan: &RepairPlan) -> Result<String, MalformedDocument> {
    if plan.is_empty() {
        return Ok(xml.to_string());
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut rewriter = Rewriter::new(plan);
    let mut depth = 0usize;
    let mut skip_until: Option<usize> = None;

    loop {
        let event = reader.read_event().map_err(rewrite_error)?;

        // inside a dropped subtree
        if let Some(level) = skip_until {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == level {
                        skip_until = None;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => {
                match rewriter.decide(&e, depth) {
                    Action::Keep => writer.write_event(Event::Start(e)).map_err(rewrite_error)?,
                    Action::Drop => skip_until = Some(depth),
                    Action::Renumber(n) => writer
                        .write_event(Event::Start(renumbered(&e, n)?))
                        .map_err(rewrite_error)?,
                }
                depth += 1;
            }
            Event::Empty(e) => match rewriter.decide(&e, depth) {
                Action::Keep => writer.write_event(Event::Empty(e)).map_err(rewrite_error)?,
                Action::Drop => {}
                Action::Renumber(n) => writer
                    .write_event(Event::Empty(renumbered(&e, n)?))
                    .map_err(rewrite_error)?,
            },
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(e)).map_err(rewrite_error)?;
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(rewrite_error)?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(rewrite_error)
}

/// Tracks where in the score-partwise tree the stream currently is
struct Rewriter<'p> {
    plan: &'p RepairPlan,
    part_position: usize,
    in_part_list: bool,
    renumbering: bool,
    measure_number: u32,
}

impl<'p> Rewriter<'p> {
    fn new(plan: &'p RepairPlan) -> Self {
        Self {
            plan,
            part_position: 0,
            in_part_list: false,
            renumbering: false,
            measure_number: 0,
        }
    }

    /// `depth` is the number of open ancestors; the root element sits at 0
    fn decide(&mut self, e: &BytesStart, depth: usize) -> Action {
        let name = e.name();
        match (depth, name.as_ref()) {
            (1, b"part") => {
                let position = self.part_position;
                self.part_position += 1;
                self.in_part_list = false;
                if self.plan.drops_part(position) {
                    self.renumbering = false;
                    return Action::Drop;
                }
                self.renumbering = self.plan.renumbers_part(position);
                self.measure_number = 0;
                Action::Keep
            }
            (1, tag) => {
                self.in_part_list = tag == b"part-list";
                self.renumbering = false;
                Action::Keep
            }
            (2, b"score-part") if self.in_part_list => {
                let dropped = e
                    .try_get_attribute("id")
                    .ok()
                    .flatten()
                    .and_then(|attr| attr.unescape_value().ok().map(|v| self.plan.drops_score_part(&v)))
                    .unwrap_or(false);
                if dropped {
                    Action::Drop
                } else {
                    Action::Keep
                }
            }
            (2, b"measure") if self.renumbering => {
                self.measure_number += 1;
                Action::Renumber(self.measure_number)
            }
            _ => Action::Keep,
        }
    }
}

/// Copy of a `<measure>` start tag with its `number` attribute replaced
fn renumbered(e: &BytesStart, number: u32) -> Result<BytesStart<'static>, MalformedDocument> {
    let number = number.to_string();
    let mut out = BytesStart::new("measure");
    let mut replaced = false;

    for attr in e.attributes() {
        let attr = attr.map_err(rewrite_error)?;
        let key: &[u8] = attr.key.as_ref();
        if key == b"number" {
            out.push_attribute(("number", number.as_str()));
            replaced = true;
        } else {
            let value: &[u8] = &attr.value;
            out.push_attribute((key, value));
        }
    }
    if !replaced {
        out.push_attribute(("number", number.as_str()));
    }
    Ok(out)
}

fn rewrite_error(e: impl Display) -> MalformedDocument {
    MalformedDocument::Rewrite(e.to_string())
}
