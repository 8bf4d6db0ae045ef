use thiserror::Error;
use tracing::error;

/// One recorded edit. Every offset refers to the original text the set is
/// applied to, never to an intermediate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert { pos: usize, text: String },
    Remove { start: usize, end: usize },
    Replace { start: usize, end: usize, text: String },
    Move { start: usize, end: usize, dest: usize },
    Copy { start: usize, end: usize, dest: usize },
    Flip { start1: usize, end1: usize, start2: usize, end2: usize },
}

impl Edit {
    /// Spans this edit deletes from the original text. Empty spans never
    /// conflict with anything and are left out.
    fn destructive_spans(&self) -> Vec<(usize, usize)> {
        let spans = match *self {
            Edit::Insert { .. } | Edit::Copy { .. } => vec![],
            Edit::Remove { start, end }
            | Edit::Replace { start, end, .. }
            | Edit::Move { start, end, .. } => vec![(start, end)],
            Edit::Flip {
                start1,
                end1,
                start2,
                end2,
            } => vec![(start1, end1), (start2, end2)],
        };
        spans.into_iter().filter(|(s, e)| s < e).collect()
    }

    /// Positions where this edit places new text.
    fn insertion_points(&self) -> Vec<usize> {
        match *self {
            Edit::Insert { pos, .. } => vec![pos],
            Edit::Replace { start, .. } => vec![start],
            Edit::Move { dest, .. } | Edit::Copy { dest, .. } => vec![dest],
            Edit::Flip { start1, start2, .. } => vec![start1, start2],
            Edit::Remove { .. } => vec![],
        }
    }

    fn offsets(&self) -> Vec<usize> {
        match *self {
            Edit::Insert { pos, .. } => vec![pos],
            Edit::Remove { start, end } | Edit::Replace { start, end, .. } => vec![start, end],
            Edit::Move { start, end, dest } | Edit::Copy { start, end, dest } => {
                vec![start, end, dest]
            }
            Edit::Flip {
                start1,
                end1,
                start2,
                end2,
            } => vec![start1, end1, start2, end2],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeSetError {
    #[error("invalid span [{start}, {end})")]
    InvalidSpan { start: usize, end: usize },
    #[error("span [{start}, {end}) overlaps [{other_start}, {other_end})")]
    Overlap {
        start: usize,
        end: usize,
        other_start: usize,
        other_end: usize,
    },
    #[error("insertion at {pos} falls inside removed span [{start}, {end})")]
    InsertInsideRemoval { pos: usize, start: usize, end: usize },
    #[error("move destination {dest} lies inside its source [{start}, {end})")]
    MoveIntoSource { start: usize, end: usize, dest: usize },
    #[error("offset {offset} is outside the text (len={len})")]
    OutOfRange { offset: usize, len: usize },
    #[error("offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}

/// An ordered batch of edits against one document, applied in a single pass.
///
/// Conflicts are detected as edits are added. The first conflict is kept and
/// makes [`ChangeSet::apply`] refuse the whole set, so a malformed set never
/// produces partially edited text.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    edits: Vec<Edit>,
    error: Option<ChangeSetError>,
}

enum Piece<'a> {
    Text(&'a str),
    Original(usize, usize),
}

struct Placement<'a> {
    pos: usize,
    seq: usize,
    piece: Piece<'a>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pos: usize, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if !text.is_empty() {
            self.push(Edit::Insert { pos, text });
        }
        self
    }

    pub fn remove(&mut self, start: usize, end: usize) -> &mut Self {
        if start == end {
            return self;
        }
        self.push(Edit::Remove { start, end })
    }

    pub fn replace(&mut self, start: usize, end: usize, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if start == end {
            return self.insert(start, text);
        }
        self.push(Edit::Replace { start, end, text })
    }

    pub fn move_range(&mut self, start: usize, end: usize, dest: usize) -> &mut Self {
        if start == end {
            return self;
        }
        if start < dest && dest < end {
            return self.fail(ChangeSetError::MoveIntoSource { start, end, dest });
        }
        self.push(Edit::Move { start, end, dest })
    }

    pub fn copy(&mut self, start: usize, end: usize, dest: usize) -> &mut Self {
        if start == end {
            return self;
        }
        self.push(Edit::Copy { start, end, dest })
    }

    pub fn flip(&mut self, start1: usize, end1: usize, start2: usize, end2: usize) -> &mut Self {
        if start1 < end2 && start2 < end1 {
            return self.fail(ChangeSetError::Overlap {
                start: start2,
                end: end2,
                other_start: start1,
                other_end: end1,
            });
        }
        self.push(Edit::Flip {
            start1,
            end1,
            start2,
            end2,
        })
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn error(&self) -> Option<&ChangeSetError> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    fn fail(&mut self, err: ChangeSetError) -> &mut Self {
        error!(%err, "rejecting edit");
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }

    fn push(&mut self, edit: Edit) -> &mut Self {
        match self.conflict(&edit) {
            Some(err) => self.fail(err),
            None => {
                self.edits.push(edit);
                self
            }
        }
    }

    fn conflict(&self, edit: &Edit) -> Option<ChangeSetError> {
        let offsets = edit.offsets();
        for pair in offsets.chunks(2) {
            if let [start, end] = *pair {
                if start > end && !matches!(edit, Edit::Insert { .. }) {
                    return Some(ChangeSetError::InvalidSpan { start, end });
                }
            }
        }
        let new_spans = edit.destructive_spans();
        let new_points = edit.insertion_points();
        for existing in &self.edits {
            for (other_start, other_end) in existing.destructive_spans() {
                for &(start, end) in &new_spans {
                    if start < other_end && other_start < end {
                        return Some(ChangeSetError::Overlap {
                            start,
                            end,
                            other_start,
                            other_end,
                        });
                    }
                }
                for &pos in &new_points {
                    if other_start < pos && pos < other_end {
                        return Some(ChangeSetError::InsertInsideRemoval {
                            pos,
                            start: other_start,
                            end: other_end,
                        });
                    }
                }
            }
            for pos in existing.insertion_points() {
                for &(start, end) in &new_spans {
                    if start < pos && pos < end {
                        return Some(ChangeSetError::InsertInsideRemoval { pos, start, end });
                    }
                }
            }
        }
        None
    }

    /// Apply every edit to `text` in one left-to-right pass.
    ///
    /// Removed spans are skipped, and text placed at a position is emitted in
    /// the order the edits were added. Replacement text lands at the start of
    /// its span, so an insert added before a replace at the same offset
    /// precedes the replacement.
    pub fn apply(&self, text: &str) -> Result<String, ChangeSetError> {
        if let Some(err) = &self.error {
            error!(%err, "refusing to apply change set");
            return Err(err.clone());
        }
        for edit in &self.edits {
            for offset in edit.offsets() {
                if offset > text.len() {
                    return Err(ChangeSetError::OutOfRange {
                        offset,
                        len: text.len(),
                    });
                }
                if !text.is_char_boundary(offset) {
                    return Err(ChangeSetError::NotCharBoundary { offset });
                }
            }
        }

        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut placements: Vec<Placement<'_>> = Vec::new();
        for (seq, edit) in self.edits.iter().enumerate() {
            spans.extend(edit.destructive_spans());
            match edit {
                Edit::Insert { pos, text } => placements.push(Placement {
                    pos: *pos,
                    seq,
                    piece: Piece::Text(text),
                }),
                Edit::Replace { start, text, .. } => placements.push(Placement {
                    pos: *start,
                    seq,
                    piece: Piece::Text(text),
                }),
                Edit::Move { start, end, dest } | Edit::Copy { start, end, dest } => {
                    placements.push(Placement {
                        pos: *dest,
                        seq,
                        piece: Piece::Original(*start, *end),
                    })
                }
                Edit::Flip {
                    start1,
                    end1,
                    start2,
                    end2,
                } => {
                    placements.push(Placement {
                        pos: *start1,
                        seq,
                        piece: Piece::Original(*start2, *end2),
                    });
                    placements.push(Placement {
                        pos: *start2,
                        seq,
                        piece: Piece::Original(*start1, *end1),
                    });
                }
                Edit::Remove { .. } => {}
            }
        }
        spans.sort_unstable();
        for pair in spans.windows(2) {
            if pair[1].0 < pair[0].1 {
                let err = ChangeSetError::Overlap {
                    start: pair[1].0,
                    end: pair[1].1,
                    other_start: pair[0].0,
                    other_end: pair[0].1,
                };
                error!(%err, "refusing to apply change set");
                return Err(err);
            }
        }
        placements.sort_by_key(|p| (p.pos, p.seq));

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut spans = spans.into_iter().peekable();
        let mut placements = placements.into_iter().peekable();
        loop {
            let next_place = placements.peek().map(|p| p.pos);
            let next_span = spans.peek().map(|s| s.0);
            let take_placement = match (next_place, next_span) {
                (None, None) => break,
                (Some(p), Some(s)) => p <= s,
                (Some(_), None) => true,
                (None, Some(_)) => false,
            };
            if take_placement {
                let Some(placement) = placements.next() else {
                    break;
                };
                if placement.pos > cursor {
                    out.push_str(&text[cursor..placement.pos]);
                    cursor = placement.pos;
                }
                match placement.piece {
                    Piece::Text(t) => out.push_str(t),
                    Piece::Original(s, e) => out.push_str(&text[s..e]),
                }
            } else {
                let Some((start, end)) = spans.next() else {
                    break;
                };
                if start > cursor {
                    out.push_str(&text[cursor..start]);
                }
                cursor = cursor.max(end);
            }
        }
        if cursor < text.len() {
            out.push_str(&text[cursor..]);
        }
        Ok(out)
    }
}
