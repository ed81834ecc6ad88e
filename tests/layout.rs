// Paragraph layout tests using fixed-pitch metrics: every char is 10 wide,
// with ascent 8 and descent 2.

use para_layout::*;

const A: &str = "\u{5D0}\u{5D1}";
const B: &str = "\u{5D2}\u{5D3}";

fn metrics() -> FixedMetrics {
    FixedMetrics::new(CharMetrics::new(10, 8, 2))
}

fn plain(text: &str) -> StyledText {
    styled(text, Direction::Ltr)
}

fn styled(text: &str, dir: Direction) -> StyledText {
    StyledTextBuilder::new()
        .text(text, CharProps::default())
        .build(dir)
        .unwrap()
}

struct Env<R> {
    renderer: R,
    objects: FixedObjects,
    diagnostics: Diagnostics,
}

impl Env<SimpleRenderer<FixedMetrics>> {
    fn new() -> Self {
        Env::with(SimpleRenderer::new(metrics()))
    }
}

impl<R: Renderer> Env<R> {
    fn with(renderer: R) -> Self {
        Env {
            renderer,
            objects: FixedObjects::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn cx<'a>(&'a mut self, source: &'a dyn TextSource) -> LayoutContext<'a> {
        LayoutContext {
            source,
            renderer: &mut self.renderer,
            objects: &mut self.objects,
            diagnostics: &mut self.diagnostics,
        }
    }

    fn layout(&mut self, para: &mut ParagraphBox, source: &dyn TextSource, width: i32) -> LayoutOutcome {
        para.layout(self.cx(source), width).unwrap()
    }

    fn relayout(
        &mut self,
        para: &mut ParagraphBox,
        source: &dyn TextSource,
        width: i32,
        diff: TextDiff,
    ) -> LayoutOutcome {
        para.relayout(self.cx(source), width, diff).unwrap()
    }
}

fn layout(style: ParagraphStyle, source: &dyn TextSource, width: i32) -> ParagraphBox {
    let mut para = ParagraphBox::new(style);
    Env::new().layout(&mut para, source, width);
    para
}

fn line_texts(para: &ParagraphBox) -> Vec<std::ops::Range<usize>> {
    para.lines().iter().map(|line| line.text().to_std()).collect()
}

fn nth_box(para: &ParagraphBox, n: usize) -> &LayoutBox {
    para.get(para.chain()[n]).unwrap()
}

fn assert_same_layout(a: &ParagraphBox, b: &ParagraphBox) {
    assert_eq!(a.lines(), b.lines());
    assert_eq!(
        a.boxes().collect::<Vec<_>>(),
        b.boxes().collect::<Vec<_>>()
    );
    assert_eq!((a.width(), a.height()), (b.width(), b.height()));
    assert_eq!(a.arena().num_live(), a.chain().len());
}

#[test]
fn wraps_at_spaces() {
    let text = plain("Hello world");
    let para = layout(ParagraphStyle::default(), &text, 80);
    assert_eq!(line_texts(&para), [0..6, 6..11]);

    let lines = para.lines();
    assert_eq!((lines[0].top(), lines[0].baseline(), lines[0].bottom()), (0, 8, 10));
    assert_eq!((lines[1].top(), lines[1].baseline(), lines[1].bottom()), (10, 18, 20));
    assert_eq!(para.height(), 20);
    // Trailing whitespace does not count
    assert_eq!(para.width(), 50);
    assert!(!lines[0].hard_break());

    let text = plain("Hello world");
    let para = layout(ParagraphStyle::default(), &text, 200);
    assert_eq!(line_texts(&para), [0..11]);
    assert_eq!(para.width(), 110);
}

#[test]
fn trailing_whitespace_hangs() {
    let text = plain("aaa   bbb");
    let para = layout(ParagraphStyle::default(), &text, 50);
    assert_eq!(line_texts(&para), [0..6, 6..9]);
    assert_eq!(para.lines()[0].right(), 30);
    let seg = nth_box(&para, 0).segment().unwrap();
    assert!(seg.is_end_line());
    assert_eq!(seg.width(), 30);
}

#[test]
fn hard_breaks() {
    let text = plain("ab\ncd\n");
    let para = layout(ParagraphStyle::default(), &text, 100);
    assert_eq!(line_texts(&para), [0..3, 3..6, 6..6]);
    let lines = para.lines();
    assert!(lines[0].hard_break() && lines[1].hard_break());
    assert!(!lines[2].hard_break());
    assert_eq!(lines[2].height(), 10);
    assert_eq!(para.height(), 30);
    assert_eq!(nth_box(&para, 0).range(), Range::from(0..3));
}

#[test]
fn indent_after_hard_break() {
    let text = plain("ab\n  cd");
    let para = layout(ParagraphStyle::default(), &text, 200);
    assert_eq!(line_texts(&para), [0..3, 3..7]);
    assert_eq!(nth_box(&para, 0).range(), Range::from(0..3));
    let first = para.line_boxes(1).next().unwrap();
    assert_eq!(first.range().start(), 3);
    assert_eq!(first.left(), 0);
    assert_eq!(para.width(), 40);
}

#[test]
fn empty_text() {
    let text = plain("");
    let para = layout(ParagraphStyle::default(), &text, 100);
    assert_eq!(line_texts(&para), [0..0]);
    assert_eq!(para.height(), 10);
    assert_eq!(para.width(), 0);
    assert_eq!(para.chain().len(), 1);
}

#[test]
fn no_runs() {
    let text = StyledTextBuilder::new().build(Direction::Ltr).unwrap();
    let mut para = ParagraphBox::default();
    let mut env = Env::new();
    assert_eq!(para.layout(env.cx(&text), 100), Err(LayoutError::NoRuns));
}

#[test]
fn narrow_width_clips_one_char_per_line() {
    let text = plain("ab");
    let para = layout(ParagraphStyle::default(), &text, 5);
    assert_eq!(line_texts(&para), [0..1, 1..2]);
    assert_eq!(para.width(), 10);
}

#[test]
fn letter_break_when_no_word_fits() {
    let text = plain("abcdefghijkl");
    let para = layout(ParagraphStyle::default(), &text, 50);
    assert_eq!(line_texts(&para), [0..5, 5..10, 10..12]);
}

#[test]
fn backtrack_to_earlier_break() {
    // The run boundary after "bb" is not a valid line end
    let text = StyledTextBuilder::new()
        .text("aaa bb", CharProps::default())
        .text("cc dd", CharProps::new(WsId(1), 10_000))
        .build(Direction::Ltr)
        .unwrap();
    let para = layout(ParagraphStyle::default(), &text, 70);
    assert_eq!(line_texts(&para), [0..4, 4..11]);
    assert_eq!(para.lines()[0].right(), 30);
    assert_eq!(para.lines()[1].right(), 70);
    assert_eq!(para.arena().num_live(), para.chain().len());
}

#[test]
fn picture_moves_to_next_line() {
    let picture = EmbeddedObject {
        id: ObjectId(1),
        kind: ObjectKind::Picture {
            width: 30,
            ascent: 20,
            descent: 0,
        },
    };
    let text = StyledTextBuilder::new()
        .text("aaaa", CharProps::default())
        .object(picture, CharProps::default(), 1)
        .text("  bb", CharProps::default())
        .build(Direction::Ltr)
        .unwrap();
    let para = layout(ParagraphStyle::default(), &text, 60);
    assert_eq!(line_texts(&para), [0..4, 4..9]);

    let b = nth_box(&para, 1);
    assert_eq!(b.kind(), &BoxKind::Picture(ObjectId(1)));
    assert_eq!((b.left(), b.top(), b.width()), (0, 10, 30));
    assert_eq!(para.lines()[1].baseline(), 30);
    assert_eq!(nth_box(&para, 2).left(), 30);
    assert_eq!(para.arena().num_live(), para.chain().len());
}

#[test]
fn objects_share_the_baseline() {
    let pile = EmbeddedObject {
        id: ObjectId(7),
        kind: ObjectKind::Pile,
    };
    let text = StyledTextBuilder::new()
        .text("ab", CharProps::default())
        .object(pile, CharProps::default(), 3)
        .text("cd", CharProps::default())
        .build(Direction::Ltr)
        .unwrap();
    assert_eq!((text.cch_ren(), text.cch_log()), (5, 7));

    let mut env = Env::new();
    env.objects.insert(
        ObjectId(7),
        ObjectMetrics {
            width: 40,
            ascent: 15,
            descent: 5,
        },
    );
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &text, 100);
    assert_eq!(env.objects.fresh_layouts(), 1);
    assert_eq!(line_texts(&para), [0..5]);

    let line = &para.lines()[0];
    assert_eq!((line.baseline(), line.bottom()), (15, 20));
    let b = nth_box(&para, 1);
    assert_eq!((b.left(), b.top(), b.baseline()), (20, 0, 15));
    assert_eq!(para.log_range(&text, para.chain()[1]), Some(2..5));
    let b = nth_box(&para, 2);
    assert_eq!((b.left(), b.top(), b.baseline()), (60, 7, 15));
}

#[test]
fn unknown_pile_is_recorded() {
    let pile = EmbeddedObject {
        id: ObjectId(3),
        kind: ObjectKind::Pile,
    };
    let text = StyledTextBuilder::new()
        .text("ab", CharProps::default())
        .object(pile, CharProps::default(), 1)
        .build(Direction::Ltr)
        .unwrap();
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &text, 100);
    assert_eq!(line_texts(&para), [0..3]);
    assert_eq!(
        env.diagnostics.errors(),
        [(2, MeasureError::UnknownObject(ObjectId(3)))]
    );
    assert_eq!(nth_box(&para, 1).width(), 0);
}

#[test]
fn exact_line_spacing() {
    let style = ParagraphStyle {
        line_spacing: LineSpacing::Exact(20),
        ..Default::default()
    };
    let text = plain("aaa bbb ccc");
    let para = layout(style.clone(), &text, 80);
    let lines = para.lines();
    assert_eq!((lines[0].top(), lines[0].baseline(), lines[0].bottom()), (0, 16, 20));
    assert_eq!((lines[1].top(), lines[1].baseline(), lines[1].bottom()), (20, 36, 40));
    assert_eq!(nth_box(&para, 0).top(), 8);

    // 60% ascent wins the vote
    let renderer = SimpleRenderer::new(metrics().with_ws(WsId(1), CharMetrics::new(10, 6, 4)));
    let text = StyledTextBuilder::new()
        .text("aaa", CharProps::new(WsId(1), 10_000))
        .build(Direction::Ltr)
        .unwrap();
    let mut para = ParagraphBox::new(style);
    Env::with(renderer).layout(&mut para, &text, 80);
    assert_eq!(para.lines()[0].baseline(), 12);
    assert_eq!(para.height(), 20);
}

#[test]
fn at_least_line_spacing() {
    let style = ParagraphStyle {
        line_spacing: LineSpacing::AtLeast(14),
        ..Default::default()
    };
    let para = layout(style, &plain("ab"), 80);
    let line = &para.lines()[0];
    assert_eq!((line.top(), line.baseline(), line.bottom()), (0, 12, 14));

    let style = ParagraphStyle {
        line_spacing: LineSpacing::AtLeast(6),
        ..Default::default()
    };
    let para = layout(style, &plain("ab"), 80);
    assert_eq!(para.lines()[0].height(), 10);
}

#[test]
fn max_lines_with_ellipsis() {
    let style = ParagraphStyle {
        max_lines: Some(1),
        ellipsis: true,
        ..Default::default()
    };
    let text = plain("aaa bbb ccc ddd");
    let para = layout(style.clone(), &text, 80);
    assert_eq!(line_texts(&para), [0..8]);
    let line = &para.lines()[0];
    assert!(line.ellipsis());
    assert_eq!(line.right(), 80);
    assert_eq!(para.chain().len(), 2);
    let b = nth_box(&para, 1);
    assert_eq!(b.kind(), &BoxKind::Ellipsis);
    assert_eq!((b.left(), b.width()), (70, 10));

    // No ellipsis when everything fits
    let para = layout(style, &plain("aaaa bbb"), 80);
    assert_eq!(line_texts(&para), [0..8]);
    assert!(!para.lines()[0].ellipsis());
}

#[test]
fn max_lines_without_ellipsis() {
    let style = ParagraphStyle {
        max_lines: Some(2),
        ..Default::default()
    };
    let para = layout(style, &plain("aaa bbb ccc ddd"), 40);
    assert_eq!(line_texts(&para), [0..4, 4..8]);
    assert_eq!(para.height(), 20);
}

#[test]
fn alignment() {
    let style = ParagraphStyle {
        align: Align::Justify,
        ..Default::default()
    };
    let para = layout(style, &plain("aaa bbb ccc"), 100);
    assert_eq!(line_texts(&para), [0..8, 8..11]);
    assert_eq!(para.lines()[0].right(), 100);
    assert_eq!(nth_box(&para, 0).segment().unwrap().stretch(), 30);
    assert_eq!(para.lines()[1].right(), 30);

    let style = ParagraphStyle {
        align: Align::Center,
        ..Default::default()
    };
    let para = layout(style, &plain("ab"), 100);
    let line = &para.lines()[0];
    assert_eq!((line.left(), line.right()), (40, 60));

    let style = ParagraphStyle {
        align: Align::Right,
        ..Default::default()
    };
    let para = layout(style, &plain("ab"), 100);
    assert_eq!(para.lines()[0].left(), 80);
}

#[test]
fn indents() {
    let style = ParagraphStyle {
        leading_indent: 10,
        first_indent: 20,
        ..Default::default()
    };
    let para = layout(style, &plain("aaa bbb ccc"), 100);
    assert_eq!(line_texts(&para), [0..8, 8..11]);
    assert_eq!(para.lines()[0].left(), 30);
    assert_eq!(para.lines()[1].left(), 10);
}

#[test]
fn right_to_left_paragraph() {
    let text = StyledTextBuilder::new()
        .text(&format!("{A} {B}"), CharProps::default())
        .build(Direction::Rtl)
        .unwrap();
    let para = layout(ParagraphStyle::default(), &text, 100);
    assert_eq!(line_texts(&para), [0..5]);
    let line = &para.lines()[0];
    assert!(line.is_rtl());
    assert_eq!((line.left(), line.right()), (50, 100));

    let lefts: Vec<i32> = para.boxes().map(|b| b.left()).collect();
    assert_eq!(lefts, [80, 70, 50]);
    assert!(nth_box(&para, 0).segment().unwrap().is_start_line());
    assert!(nth_box(&para, 2).segment().unwrap().is_end_line());
}

#[test]
fn mixed_direction_reorders() {
    let text = plain(&format!("ab {A} {B} cd"));
    let para = layout(ParagraphStyle::default(), &text, 200);
    assert_eq!(line_texts(&para), [0..11]);
    assert!(!para.lines()[0].is_rtl());

    let lefts: Vec<i32> = para.boxes().map(|b| b.left()).collect();
    assert_eq!(lefts, [0, 20, 60, 50, 30, 80, 90]);
    assert!(nth_box(&para, 2).level().is_rtl());
}

#[test]
fn inverted_lines_grow_upwards() {
    let style = ParagraphStyle {
        inverted: true,
        ..Default::default()
    };
    let para = layout(style, &plain("aaa bbb ccc"), 80);
    let lines = para.lines();
    assert_eq!(line_texts(&para), [0..8, 8..11]);
    assert_eq!((lines[0].top(), lines[0].bottom()), (10, 20));
    assert_eq!((lines[1].top(), lines[1].bottom()), (0, 10));
    assert_eq!(nth_box(&para, 0).top(), 10);
    assert_eq!(para.height(), 20);
}

#[test]
fn space_before_and_after() {
    let style = ParagraphStyle {
        space_before: 5,
        space_after: 3,
        ..Default::default()
    };
    let para = layout(style.clone(), &plain("aaa bbb ccc"), 80);
    assert_eq!(para.lines()[0].top(), 5);
    assert_eq!(para.height(), 28);

    let style = ParagraphStyle {
        inverted: true,
        ..style
    };
    let para = layout(style, &plain("aaa bbb ccc"), 80);
    assert_eq!(para.lines()[1].top(), 3);
    assert_eq!(para.lines()[0].top(), 13);
    assert_eq!(para.height(), 28);
}

/// Reports a line separator as an ordinary break
struct SeparatorAsOkayBreak(SimpleRenderer<FixedMetrics>);

impl Renderer for SeparatorAsOkayBreak {
    fn begin_layout(&mut self, source: &dyn TextSource) {
        self.0.begin_layout(source)
    }

    fn end_layout(&mut self) {
        self.0.end_layout()
    }

    fn find_break_point(
        &mut self,
        source: &dyn TextSource,
        req: &SegmentRequest<'_>,
    ) -> Result<Option<Segment>, MeasureError> {
        let seg = self.0.find_break_point(source, req)?;
        Ok(seg.map(|seg| {
            let lim = seg.ich_lim();
            if seg.end() == EndSeg::HardBreak
                && lim < source.cch_ren()
                && source.char_at(lim) == HARD_LINE_BREAK
            {
                Segment::new(
                    seg.range(),
                    seg.width(),
                    seg.width() - seg.visible_width(),
                    (seg.ascent(), seg.descent()),
                    seg.level(),
                    EndSeg::OkayBreak,
                )
                .with_can_end_line(false)
            } else {
                seg
            }
        }))
    }

    fn ellipsis_width(&mut self, props: &CharProps) -> i32 {
        self.0.ellipsis_width(props)
    }
}

#[test]
fn line_separator_ends_line() {
    let text = plain("ab\u{2028}cd");
    let mut env = Env::with(SeparatorAsOkayBreak(SimpleRenderer::new(metrics())));
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &text, 100);
    assert_eq!(line_texts(&para), [0..3, 3..5]);
    assert!(para.lines()[0].hard_break());
    assert!(nth_box(&para, 0).segment().unwrap().can_end_line());
}

/// Fails every measurement starting at `at`
struct FailAt {
    inner: SimpleRenderer<FixedMetrics>,
    at: usize,
}

impl Renderer for FailAt {
    fn find_break_point(
        &mut self,
        source: &dyn TextSource,
        req: &SegmentRequest<'_>,
    ) -> Result<Option<Segment>, MeasureError> {
        if req.ich_min == self.at && req.ich_lim > req.ich_min {
            return Err(MeasureError::Failed("test".to_string()));
        }
        self.inner.find_break_point(source, req)
    }

    fn ellipsis_width(&mut self, props: &CharProps) -> i32 {
        self.inner.ellipsis_width(props)
    }
}

#[test]
fn measurement_failures_are_recorded() {
    let text = plain("aaa bbb");
    let mut env = Env::with(FailAt {
        inner: SimpleRenderer::new(metrics()),
        at: 0,
    });
    let mut para = ParagraphBox::default();
    let outcome = env.layout(&mut para, &text, 100);
    assert!(!outcome.aborted);
    assert_eq!(line_texts(&para), [0..7]);
    assert_eq!(nth_box(&para, 0).width(), 0);
    assert_eq!(env.diagnostics.errors().len(), 1);
    assert_eq!(env.diagnostics.errors()[0].0, 0);

    let text = StyledTextBuilder::new()
        .text("aaa ", CharProps::default())
        .text("bbb", CharProps::new(WsId(1), 10_000))
        .build(Direction::Ltr)
        .unwrap();
    let mut env = Env::with(FailAt {
        inner: SimpleRenderer::new(metrics()),
        at: 4,
    });
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &text, 100);
    assert_eq!(line_texts(&para), [0..4, 4..7]);
    let at: Vec<usize> = env.diagnostics.errors().iter().map(|(i, _)| *i).collect();
    assert_eq!(at, [4, 4]);
}

#[test]
fn relayout_resynchronizes() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &plain("one\ntwo\nthree"), 100);
    let caret = para.track_selection(Selection::caret(9));

    // Insert "x" at 5
    let text = plain("one\ntxwo\nthree");
    let diff = TextDiff {
        ich_min: 5,
        ich_lim: 6,
        delta: 1,
    };
    let outcome = env.relayout(&mut para, &text, 100, diff);
    assert!(outcome.partial);
    assert_eq!(outcome.lines_built, 2);
    assert_eq!(outcome.resynced_at, Some(2));
    assert_eq!(line_texts(&para), [0..4, 4..9, 9..14]);
    assert_eq!(para.selection(caret), Some(Selection::caret(10)));
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 100));

    // Delete "w"
    let text = plain("one\ntxo\nthree");
    let diff = TextDiff {
        ich_min: 6,
        ich_lim: 6,
        delta: -1,
    };
    let outcome = env.relayout(&mut para, &text, 100, diff);
    assert_eq!(outcome.resynced_at, Some(2));
    assert_eq!(line_texts(&para), [0..4, 4..8, 8..13]);
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 100));
}

#[test]
fn relayout_moves_later_lines() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &plain("one\ntwo\nthree"), 100);
    assert_eq!(para.lines()[2].top(), 20);

    // A larger char makes line 1 taller
    let text = StyledTextBuilder::new()
        .text("one\ntw", CharProps::default())
        .text("X", CharProps::new(WsId(0), 20_000))
        .text("o\nthree", CharProps::default())
        .build(Direction::Ltr)
        .unwrap();
    let diff = TextDiff {
        ich_min: 6,
        ich_lim: 7,
        delta: 1,
    };
    let outcome = env.relayout(&mut para, &text, 100, diff);
    assert_eq!(outcome.resynced_at, Some(2));
    let lines = para.lines();
    assert_eq!((lines[1].top(), lines[1].baseline(), lines[1].bottom()), (10, 26, 30));
    assert_eq!((lines[2].top(), lines[2].bottom()), (30, 40));
    assert_eq!(para.height(), 40);
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 100));
}

#[test]
fn relayout_reflows_to_the_end() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &plain("aaa bbb ccc ddd eee"), 80);
    assert_eq!(line_texts(&para), [0..8, 8..16, 16..19]);

    let text = plain("zz aaa bbb ccc ddd eee");
    let diff = TextDiff {
        ich_min: 0,
        ich_lim: 3,
        delta: 3,
    };
    let outcome = env.relayout(&mut para, &text, 80, diff);
    assert!(outcome.partial);
    assert_eq!(outcome.resynced_at, None);
    assert_eq!(outcome.lines_built, 3);
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 80));

    // Append at the end
    let text = plain("zz aaa bbb ccc ddd eee!");
    let diff = TextDiff {
        ich_min: 22,
        ich_lim: 23,
        delta: 1,
    };
    env.relayout(&mut para, &text, 80, diff);
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 80));
}

#[test]
fn relayout_replacing_text() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &plain("aaa bbb ccc ddd eee"), 80);

    let text = plain("aaa bbb ccc xyz eee");
    let diff = TextDiff {
        ich_min: 12,
        ich_lim: 15,
        delta: 0,
    };
    let outcome = env.relayout(&mut para, &text, 80, diff);
    assert_eq!(outcome.lines_built, 2);
    assert_eq!(outcome.resynced_at, Some(2));
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 80));
}

#[test]
fn relayout_falls_back_to_full_layout() {
    let mut env = Env::new();
    let text = plain("aaa bbb ccc");
    let diff = TextDiff {
        ich_min: 0,
        ich_lim: 0,
        delta: 0,
    };

    let mut para = ParagraphBox::default();
    assert!(para.is_stale());
    let outcome = env.relayout(&mut para, &text, 80, diff);
    assert!(!outcome.partial);
    assert!(!para.is_stale());

    let outcome = env.relayout(&mut para, &text, 100, diff);
    assert!(!outcome.partial);
    assert_eq!(line_texts(&para), [0..8, 8..11]);

    assert!(para.update_style(|s| s.set_align(Align::Center)));
    assert!(para.is_stale());
    let outcome = env.relayout(&mut para, &text, 100, diff);
    assert!(!outcome.partial);
    assert_eq!(para.lines()[1].left(), 35);

    let outcome = env.relayout(&mut para, &text, 100, diff);
    assert!(outcome.partial);
}

#[test]
fn relayout_rejects_invalid_diff() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &plain("abc"), 80);

    let text = plain("abcd");
    let diff = TextDiff {
        ich_min: 3,
        ich_lim: 4,
        delta: 0,
    };
    assert_eq!(
        para.relayout(env.cx(&text), 80, diff),
        Err(LayoutError::InvalidDiff(diff))
    );
    let diff = TextDiff {
        ich_min: 3,
        ich_lim: 5,
        delta: 1,
    };
    assert_eq!(
        para.relayout(env.cx(&text), 80, diff),
        Err(LayoutError::InvalidDiff(diff))
    );
}

#[test]
fn boxes_are_recycled() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    let text = plain("aaa bbb ccc ddd eee");
    env.layout(&mut para, &text, 80);
    let capacity = para.arena().capacity();
    env.layout(&mut para, &text, 80);
    env.layout(&mut para, &text, 80);
    assert_eq!(para.arena().capacity(), capacity);
    assert_eq!(para.arena().num_live(), para.chain().len());
}

#[test]
fn find_line() {
    let para = layout(ParagraphStyle::default(), &plain("one\ntwo\nthree"), 100);
    assert_eq!(para.find_line(0), Some(0));
    assert_eq!(para.find_line(4), Some(1));
    assert_eq!(para.find_line(7), Some(1));
    assert_eq!(para.find_line(13), Some(2));
    assert_eq!(para.find_line(14), None);
    assert_eq!(para.line_boxes(1).count(), 1);
    assert_eq!(para.line_boxes(5).count(), 0);
}

#[test]
fn single_line_single_box() {
    let para = layout(ParagraphStyle::default(), &plain("Hello world"), 1000);
    assert_eq!(para.chain().len(), 1);
    let seg = nth_box(&para, 0).segment().unwrap();
    assert_eq!(seg.end(), EndSeg::NoMore);
    assert_eq!(para.height(), para.lines()[0].height());
}

#[test]
fn edit_reuses_surrounding_lines() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &plain("aaa bbb ccc ddd eee"), 40);
    assert_eq!(line_texts(&para), [0..4, 4..8, 8..12, 12..16, 16..19]);
    let before = para.chain().to_vec();

    let text = plain("aaa bbb cxy ddd eee");
    let diff = TextDiff {
        ich_min: 9,
        ich_lim: 11,
        delta: 0,
    };
    let outcome = env.relayout(&mut para, &text, 40, diff);
    assert_eq!(outcome.lines_built, 2);
    assert_eq!(outcome.resynced_at, Some(3));
    assert_eq!(para.chain()[0], before[0]);
    assert_eq!(para.chain()[3..], before[3..]);
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 40));
}

#[test]
fn coverage_and_width_bound() {
    let texts = [
        "Hello world".to_string(),
        "aaa   bbb ccc\ndd".to_string(),
        "abcdefghijkl mn".to_string(),
        format!("ab {A} {B} cd"),
        String::new(),
        "x\n\ny".to_string(),
    ];
    for text in &texts {
        let source = plain(text);
        for width in [1, 5, 25, 40, 80, 200] {
            let mut env = Env::new();
            let mut para = ParagraphBox::default();
            let outcome = env.layout(&mut para, &source, width);
            assert!(!outcome.aborted, "{text:?} at {width}");
            assert!(!para.chain().is_empty());

            let mut ich = 0;
            for b in para.boxes() {
                assert_eq!(b.range().start(), ich, "{text:?} at {width}");
                ich = b.range().end();
            }
            assert_eq!(ich, source.cch_ren(), "{text:?} at {width}");

            for line in para.lines() {
                if line.boxes().len() > 1 {
                    assert!(line.right() - line.left() <= width, "{text:?} at {width}");
                }
            }

            // Laying out again reproduces the same geometry
            let lines = para.lines().to_vec();
            let boxes: Vec<LayoutBox> = para.boxes().cloned().collect();
            env.layout(&mut para, &source, width);
            assert_eq!(para.lines(), lines);
            assert_eq!(para.boxes().cloned().collect::<Vec<_>>(), boxes);
        }
    }
}

#[test]
fn relayout_edit_at_line_start() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &plain(" xyzcxyz"), 35);
    assert_eq!(line_texts(&para), [0..1, 1..4, 4..7, 7..8]);

    // Replace "x" with a space: the first line can take both spaces
    let text = plain("  yzcxyz");
    let diff = TextDiff {
        ich_min: 1,
        ich_lim: 2,
        delta: 0,
    };
    env.relayout(&mut para, &text, 35, diff);
    assert_eq!(line_texts(&para), [0..2, 2..5, 5..8]);
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 35));
}

#[test]
fn relayout_after_hard_break_and_mixed_runs() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &plain("-xyz\n-\u{5D0}xyz-\u{5D1}"), 45);

    let text = plain("-xyz\n-\u{5D0} z-\u{5D1}");
    let diff = TextDiff {
        ich_min: 7,
        ich_lim: 8,
        delta: -1,
    };
    env.relayout(&mut para, &text, 45, diff);
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 45));
}

#[test]
fn relayout_toggling_bidi() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    env.layout(&mut para, &plain("\nxyza   bc"), 25);

    let text = plain("\nxyza\u{5D0}   bc");
    let diff = TextDiff {
        ich_min: 5,
        ich_lim: 6,
        delta: 1,
    };
    let outcome = env.relayout(&mut para, &text, 25, diff);
    assert!(!outcome.partial);
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 25));

    // And back again
    let text = plain("\nxyza   bc");
    let diff = TextDiff {
        ich_min: 5,
        ich_lim: 5,
        delta: -1,
    };
    let outcome = env.relayout(&mut para, &text, 25, diff);
    assert!(!outcome.partial);
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 25));
}

#[test]
fn relayout_changing_neutral_levels() {
    let mut env = Env::new();
    let mut para = ParagraphBox::default();
    let text = styled("\u{5D0}\n ca -q--", Direction::Rtl);
    env.layout(&mut para, &text, 45);
    assert_eq!(line_texts(&para), [0..2, 2..6, 6..10]);

    // Without "q" the hyphens after "a" resolve to the paragraph level
    let text = styled("\u{5D0}\n ca ---", Direction::Rtl);
    let diff = TextDiff {
        ich_min: 7,
        ich_lim: 7,
        delta: -1,
    };
    env.relayout(&mut para, &text, 45, diff);
    assert_same_layout(&para, &layout(ParagraphStyle::default(), &text, 45));
}

struct XorShift(u64);

impl XorShift {
    fn below(&mut self, n: usize) -> usize {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % n as u64) as usize
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.below(items.len())]
    }
}

#[test]
fn relayout_matches_full_layout() {
    const CHARS: [char; 9] = ['x', 'y', 'a', 'b', '-', ' ', '\n', '\u{5D0}', '\u{5D1}'];
    let mut rng = XorShift(0x2545_f491_4f6c_dd1d);

    for case in 0..400 {
        let dir = rng.pick(&[Direction::Ltr, Direction::Rtl]);
        let width = rng.pick(&[15, 25, 35, 45, 70]);
        let len = rng.below(13);
        let old: Vec<char> = (0..len).map(|_| rng.pick(&CHARS)).collect();

        let ich = rng.below(len + 1);
        let del = rng.below((len - ich).min(2) + 1);
        let mut ins: Vec<char> = (0..rng.below(3)).map(|_| rng.pick(&CHARS)).collect();
        if del == 0 && ins.is_empty() {
            ins.push(rng.pick(&CHARS));
        }
        let mut new = old[..ich].to_vec();
        new.extend(&ins);
        new.extend(&old[ich + del..]);

        let old: String = old.into_iter().collect();
        let new: String = new.into_iter().collect();
        let diff = TextDiff {
            ich_min: ich,
            ich_lim: ich + ins.len(),
            delta: ins.len() as isize - del as isize,
        };

        let mut env = Env::new();
        let mut para = ParagraphBox::default();
        env.layout(&mut para, &styled(&old, dir), width);
        let text = styled(&new, dir);
        env.relayout(&mut para, &text, width, diff);

        let full = layout(ParagraphStyle::default(), &text, width);
        let msg = format!("case {case}: {old:?} -> {new:?} ({dir:?}) at {width}");
        assert_eq!(para.lines(), full.lines(), "{msg}");
        assert_same_layout(&para, &full);
    }
}
