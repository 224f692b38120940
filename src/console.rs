// src/console.rs
//
// Scrollback console: incoming text, locally echoed keystrokes and the
// typing settle timer.
//
// While the settle timer is armed the console reports itself busy, and the
// session holds back incoming data so a reply does not land in the middle of
// a line the user is still typing. This is a heuristic debounce (5 s by
// default), not a protocol guarantee: a remote party that answers after the
// pause still interleaves with whatever is typed next.

use std::time::{Duration, Instant};

use crate::events::{EditKey, KeyInput};
use crate::timer::SingleShotTimer;

/// Rendered width of a tab stop.
const TAB_WIDTH: usize = 4;

/// Lines scrolled by PageUp/PageDown before the UI reports a view height.
const DEFAULT_PAGE_LINES: usize = 20;

/// Display colour of a character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextColor {
    /// Text received from the channel
    Incoming,
    /// Locally echoed keystrokes
    Local,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyledChar {
    pub ch: char,
    pub color: TextColor,
}

/// A run of same-coloured text within one display line.
pub type Run = (TextColor, String);

pub struct Console {
    text: Vec<StyledChar>,
    /// Number of '\n' in `text`
    newlines: usize,
    cursor: usize,
    color: TextColor,
    style_changes: usize,
    local_echo: bool,
    settle: SingleShotTimer,
    settle_delay: Duration,
    scroll_back: usize,
    page_lines: usize,
}

impl Console {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            text: Vec::new(),
            newlines: 0,
            cursor: 0,
            color: TextColor::Incoming,
            style_changes: 0,
            local_echo: true,
            settle: SingleShotTimer::new(),
            settle_delay,
            scroll_back: 0,
            page_lines: DEFAULT_PAGE_LINES,
        }
    }

    // ========================================================================
    // Text Input
    // ========================================================================

    /// Append received text at the end of the buffer and follow the tail.
    pub fn append(&mut self, text: &str) {
        self.set_text_color(TextColor::Incoming);
        self.cursor = self.text.len();
        self.insert_str(text);
        self.scroll_to_bottom();
    }

    /// Handle a key press.
    ///
    /// With the channel open the raw bytes go to `forward` first and the
    /// settle timer is (re)armed. With the channel closed nothing is
    /// forwarded and local echo is forced on for good, since typed text
    /// would otherwise vanish. Echo then applies the key to the buffer.
    pub fn on_key_input<F>(&mut self, now: Instant, input: &KeyInput, channel_open: bool, forward: F)
    where
        F: FnOnce(&[u8]),
    {
        if channel_open {
            forward(&input.bytes);
            self.settle.start(now, self.settle_delay);
        } else {
            self.local_echo = true;
        }

        if self.local_echo {
            self.set_text_color(TextColor::Local);
            self.apply_edit(input.key);
        }
    }

    /// Settle timer expiry: start a fresh line at the end of the buffer.
    /// Returns false if the timer was re-armed since the fire was scheduled.
    pub fn on_settle_timeout(&mut self, now: Instant) -> bool {
        if !self.settle.expire(now) {
            return false;
        }

        self.cursor = self.text.len();
        self.insert_str("\n");
        self.scroll_to_bottom();
        true
    }

    pub fn is_busy(&self) -> bool {
        self.settle.is_active()
    }

    pub fn settle_deadline(&self) -> Option<Instant> {
        self.settle.deadline()
    }

    pub fn set_local_echo_enabled(&mut self, enabled: bool) {
        self.local_echo = enabled;
    }

    pub fn local_echo_enabled(&self) -> bool {
        self.local_echo
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.newlines = 0;
        self.cursor = 0;
        self.scroll_back = 0;
    }

    // ========================================================================
    // Editing
    // ========================================================================

    fn set_text_color(&mut self, color: TextColor) {
        if self.color != color {
            self.color = color;
            self.style_changes += 1;
        }
    }

    fn insert_str(&mut self, s: &str) {
        let color = self.color;
        let chars: Vec<StyledChar> = s.chars().map(|ch| StyledChar { ch, color }).collect();
        let count = chars.len();
        self.newlines += chars.iter().filter(|c| c.ch == '\n').count();
        if self.cursor == self.text.len() {
            self.text.extend(chars);
        } else {
            self.text.splice(self.cursor..self.cursor, chars);
        }
        self.cursor += count;
    }

    fn apply_edit(&mut self, key: EditKey) {
        match key {
            EditKey::Char(ch) => {
                let mut buf = [0u8; 4];
                self.insert_str(ch.encode_utf8(&mut buf));
                self.scroll_to_bottom();
            }
            EditKey::Enter => {
                self.insert_str("\n");
                self.scroll_to_bottom();
            }
            EditKey::Tab => {
                self.insert_str("\t");
                self.scroll_to_bottom();
            }
            EditKey::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.remove_at_cursor();
                }
            }
            EditKey::Delete => {
                if self.cursor < self.text.len() {
                    self.remove_at_cursor();
                }
            }
            EditKey::Left => self.cursor = self.cursor.saturating_sub(1),
            EditKey::Right => self.cursor = (self.cursor + 1).min(self.text.len()),
            EditKey::Home => self.cursor = self.line_start(self.cursor),
            EditKey::End => self.cursor = self.line_end(self.cursor),
            EditKey::Up => self.move_vertical(false),
            EditKey::Down => self.move_vertical(true),
            EditKey::PageUp => self.scroll_up(self.page_lines),
            EditKey::PageDown => self.scroll_down(self.page_lines),
            EditKey::None => {}
        }
    }

    fn remove_at_cursor(&mut self) {
        if self.text.remove(self.cursor).ch == '\n' {
            self.newlines -= 1;
        }
    }

    fn line_start(&self, pos: usize) -> usize {
        self.text[..pos]
            .iter()
            .rposition(|c| c.ch == '\n')
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    fn line_end(&self, pos: usize) -> usize {
        self.text[pos..]
            .iter()
            .position(|c| c.ch == '\n')
            .map(|i| pos + i)
            .unwrap_or(self.text.len())
    }

    fn move_vertical(&mut self, down: bool) {
        let start = self.line_start(self.cursor);
        let column = self.cursor - start;

        if down {
            let end = self.line_end(self.cursor);
            if end == self.text.len() {
                return;
            }
            let next_start = end + 1;
            let next_end = self.line_end(next_start);
            self.cursor = next_start + column.min(next_end - next_start);
        } else {
            if start == 0 {
                return;
            }
            let prev_start = self.line_start(start - 1);
            let prev_len = (start - 1) - prev_start;
            self.cursor = prev_start + column.min(prev_len);
        }
    }

    // ========================================================================
    // View
    // ========================================================================

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.line_count().saturating_sub(1);
        self.scroll_back = (self.scroll_back + lines).min(max);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    /// Lines hidden below the viewport (0 = following the tail).
    pub fn scroll_back(&self) -> usize {
        self.scroll_back
    }

    /// Viewport height reported by the renderer; used as the page size.
    pub fn set_page_lines(&mut self, lines: usize) {
        self.page_lines = lines.max(1);
    }

    pub fn line_count(&self) -> usize {
        1 + self.newlines
    }

    /// Buffer offset where display line `line` starts. Scans back from the
    /// end, so the cost follows the distance from the tail.
    fn line_offset(&self, line: usize) -> usize {
        if line == 0 {
            return 0;
        }
        if line > self.newlines {
            return self.text.len();
        }

        let mut after = self.newlines - line;
        for (i, c) in self.text.iter().enumerate().rev() {
            if c.ch == '\n' {
                if after == 0 {
                    return i + 1;
                }
                after -= 1;
            }
        }
        0
    }

    /// All display lines as coloured runs.
    pub fn lines(&self) -> Vec<Vec<Run>> {
        self.lines_window(0, self.line_count())
    }

    /// Up to `count` display lines starting at line `first`, as coloured runs.
    /// Carriage returns and other control characters are not drawn; tabs
    /// expand to spaces.
    pub fn lines_window(&self, first: usize, count: usize) -> Vec<Vec<Run>> {
        let mut lines: Vec<Vec<Run>> = Vec::with_capacity(count);
        if count == 0 {
            return lines;
        }
        let mut line: Vec<Run> = Vec::new();

        for c in &self.text[self.line_offset(first)..] {
            if c.ch == '\n' {
                lines.push(std::mem::take(&mut line));
                if lines.len() == count {
                    return lines;
                }
                continue;
            }
            let rendered = match display_width(c.ch) {
                0 => continue,
                _ if c.ch == '\t' => " ".repeat(TAB_WIDTH),
                _ => c.ch.to_string(),
            };
            match line.last_mut() {
                Some((color, run)) if *color == c.color => run.push_str(&rendered),
                _ => line.push((c.color, rendered)),
            }
        }

        lines.push(line);
        lines
    }

    /// Cursor as (line, display column).
    pub fn cursor_position(&self) -> (usize, usize) {
        let start = self.line_start(self.cursor);
        let below = self.text[start..].iter().filter(|c| c.ch == '\n').count();
        let line = self.newlines - below;
        let column = self.text[start..self.cursor]
            .iter()
            .map(|c| display_width(c.ch))
            .sum();
        (line, column)
    }

    // ========================================================================
    // Transcript
    // ========================================================================

    pub fn to_plain_text(&self) -> String {
        self.text.iter().map(|c| c.ch).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn chars(&self) -> &[StyledChar] {
        &self.text
    }

    /// Number of times the current text colour actually changed.
    pub fn style_changes(&self) -> usize {
        self.style_changes
    }

    pub fn text_color(&self) -> TextColor {
        self.color
    }
}

fn display_width(ch: char) -> usize {
    match ch {
        '\t' => TAB_WIDTH,
        c if c.is_control() => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ch: char) -> KeyInput {
        KeyInput::new(ch.to_string().into_bytes(), EditKey::Char(ch))
    }

    fn console() -> Console {
        Console::new(Duration::from_secs(5))
    }

    #[test]
    fn test_append_uses_incoming_color() {
        let mut console = console();
        console.append("hello");
        assert_eq!(console.to_plain_text(), "hello");
        assert!(console.chars().iter().all(|c| c.color == TextColor::Incoming));
        assert_eq!(console.style_changes(), 0);
    }

    #[test]
    fn test_open_channel_forwards_then_echoes() {
        let t0 = Instant::now();
        let mut console = console();
        let mut forwarded = Vec::new();

        console.on_key_input(t0, &key('A'), true, |bytes| {
            forwarded.extend_from_slice(bytes);
        });

        assert_eq!(forwarded, b"A");
        assert_eq!(console.to_plain_text(), "A");
        assert_eq!(console.chars()[0].color, TextColor::Local);
        assert!(console.is_busy());
    }

    #[test]
    fn test_closed_channel_forces_echo() {
        let t0 = Instant::now();
        let mut console = console();
        console.set_local_echo_enabled(false);

        let mut called = false;
        console.on_key_input(t0, &key('x'), false, |_| called = true);

        assert!(!called);
        assert!(console.local_echo_enabled());
        assert_eq!(console.to_plain_text(), "x");
        assert!(!console.is_busy());
    }

    #[test]
    fn test_echo_disabled_forwards_only() {
        let t0 = Instant::now();
        let mut console = console();
        console.set_local_echo_enabled(false);

        let mut forwarded = Vec::new();
        console.on_key_input(t0, &key('q'), true, |b| forwarded.extend_from_slice(b));

        assert_eq!(forwarded, b"q");
        assert!(console.is_empty());
        assert!(console.is_busy());
    }

    #[test]
    fn test_settle_timeout_adds_newline_at_end() {
        let t0 = Instant::now();
        let mut console = console();
        console.on_key_input(t0, &key('A'), true, |_| {});
        console.on_key_input(t0, &KeyInput::new(Vec::new(), EditKey::Home), true, |_| {});

        assert!(!console.on_settle_timeout(t0 + Duration::from_secs(4)));
        assert!(console.on_settle_timeout(t0 + Duration::from_secs(5)));
        assert_eq!(console.to_plain_text(), "A\n");
        assert!(!console.is_busy());
    }

    #[test]
    fn test_keystroke_restarts_settle() {
        let t0 = Instant::now();
        let mut console = console();
        console.on_key_input(t0, &key('a'), true, |_| {});
        console.on_key_input(t0 + Duration::from_secs(3), &key('b'), true, |_| {});

        assert!(!console.on_settle_timeout(t0 + Duration::from_secs(5)));
        assert!(console.is_busy());
        assert_eq!(
            console.settle_deadline(),
            Some(t0 + Duration::from_secs(8))
        );
    }

    #[test]
    fn test_color_switch_only_on_change() {
        let t0 = Instant::now();
        let mut console = console();
        for ch in "abc".chars() {
            console.on_key_input(t0, &key(ch), false, |_| {});
        }
        assert_eq!(console.style_changes(), 1);

        console.append("xyz");
        console.append("123");
        assert_eq!(console.style_changes(), 2);

        console.on_key_input(t0, &key('d'), false, |_| {});
        assert_eq!(console.style_changes(), 3);
        assert_eq!(console.text_color(), TextColor::Local);
    }

    #[test]
    fn test_backspace_and_cursor_movement() {
        let t0 = Instant::now();
        let mut console = console();
        for ch in "abc".chars() {
            console.on_key_input(t0, &key(ch), false, |_| {});
        }
        let edit = |k| KeyInput::new(Vec::new(), k);

        console.on_key_input(t0, &edit(EditKey::Backspace), false, |_| {});
        assert_eq!(console.to_plain_text(), "ab");

        console.on_key_input(t0, &edit(EditKey::Left), false, |_| {});
        console.on_key_input(t0, &key('X'), false, |_| {});
        assert_eq!(console.to_plain_text(), "aXb");

        console.on_key_input(t0, &edit(EditKey::Home), false, |_| {});
        console.on_key_input(t0, &edit(EditKey::Delete), false, |_| {});
        assert_eq!(console.to_plain_text(), "Xb");
    }

    #[test]
    fn test_vertical_movement_clamps_column() {
        let t0 = Instant::now();
        let mut console = console();
        console.append("long line\nab");
        let edit = |k| KeyInput::new(Vec::new(), k);

        console.on_key_input(t0, &edit(EditKey::Up), false, |_| {});
        assert_eq!(console.cursor_position(), (0, 2));

        console.on_key_input(t0, &edit(EditKey::End), false, |_| {});
        console.on_key_input(t0, &edit(EditKey::Down), false, |_| {});
        assert_eq!(console.cursor_position(), (1, 2));
    }

    #[test]
    fn test_append_goes_to_end_after_cursor_moves() {
        let t0 = Instant::now();
        let mut console = console();
        console.append("abc");
        console.on_key_input(t0, &KeyInput::new(Vec::new(), EditKey::Home), false, |_| {});
        console.append("def");
        assert_eq!(console.to_plain_text(), "abcdef");
        assert_eq!(console.cursor_position(), (0, 6));
    }

    #[test]
    fn test_lines_group_runs_and_hide_carriage_returns() {
        let t0 = Instant::now();
        let mut console = console();
        console.append("OK\r\n> ");
        console.on_key_input(t0, &key('l'), false, |_| {});
        console.on_key_input(t0, &key('s'), false, |_| {});

        let lines = console.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], vec![(TextColor::Incoming, "OK".to_string())]);
        assert_eq!(
            lines[1],
            vec![
                (TextColor::Incoming, "> ".to_string()),
                (TextColor::Local, "ls".to_string()),
            ]
        );
    }

    #[test]
    fn test_lines_window_matches_full_render() {
        let t0 = Instant::now();
        let mut console = console();
        for i in 0..50 {
            console.append(&format!("line {}\r\n", i));
        }
        console.on_key_input(t0, &key('x'), false, |_| {});

        let all = console.lines();
        assert_eq!(all.len(), console.line_count());
        assert_eq!(console.lines_window(40, 11), all[40..51].to_vec());
        assert_eq!(console.lines_window(49, 100), all[49..].to_vec());
        assert_eq!(console.lines_window(0, 2), all[..2].to_vec());
        assert!(console.lines_window(10, 0).is_empty());
        assert_eq!(console.cursor_position(), (50, 1));
    }

    #[test]
    fn test_line_count_follows_edits() {
        let t0 = Instant::now();
        let mut console = console();
        let edit = |k| KeyInput::new(Vec::new(), k);
        console.append("a\nb\nc");
        assert_eq!(console.line_count(), 3);

        console.on_key_input(t0, &edit(EditKey::Up), false, |_| {});
        console.on_key_input(t0, &edit(EditKey::Home), false, |_| {});
        console.on_key_input(t0, &edit(EditKey::Backspace), false, |_| {});
        assert_eq!(console.to_plain_text(), "ab\nc");
        assert_eq!(console.line_count(), 2);
        assert_eq!(console.cursor_position(), (0, 1));

        console.on_key_input(t0, &edit(EditKey::End), false, |_| {});
        console.on_key_input(t0, &edit(EditKey::Delete), false, |_| {});
        assert_eq!(console.to_plain_text(), "abc");
        assert_eq!(console.line_count(), 1);

        console.clear();
        assert_eq!(console.line_count(), 1);
    }

    #[test]
    fn test_scrolling() {
        let mut console = console();
        console.append("1\n2\n3\n4\n");
        console.scroll_up(2);
        assert_eq!(console.scroll_back(), 2);
        console.scroll_up(100);
        assert_eq!(console.scroll_back(), 4);
        console.scroll_down(1);
        assert_eq!(console.scroll_back(), 3);
        console.append("5");
        assert_eq!(console.scroll_back(), 0);
    }

    #[test]
    fn test_clear() {
        let mut console = console();
        console.append("data");
        console.clear();
        assert!(console.is_empty());
        assert_eq!(console.cursor_position(), (0, 0));
    }
}
