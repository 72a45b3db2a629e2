//! View state machine
//!
//! Owns the presentation state (mode, current image, running transition) and
//! turns it into draw calls once per frame. Input arrives as a batch of
//! [`InputEvent`]s per tick and only a fixed set of edges is honoured:
//!
//! - welcome: fade in, wait for any key or click, fade out, then grid
//! - grid: click a cell to open it in the slideshow, page up/down
//! - slideshow: next/previous fade out and back in, toggle back to the grid
//! - anywhere: quit or cancel ends the session

use crate::catalog::{Catalog, ImageRecord};
use crate::command::{Command, InputEvent, KeyBindings};
use crate::layout::{fit_rect, fit_rect_within, hit_test, GridPager, LayoutCache, Rect};
use crate::settings::{GridLayout, Rgb, Settings, TransitionStyle};
use crate::transition::{Fade, Slide, Transition};
use crate::AppError;
use std::sync::Arc;

/// Drawing surface the state machine paints on
pub trait Renderer {
    fn clear(&mut self, color: Rgb);
    /// Draw `record` scaled into `dest` with opacity 0..=255
    fn draw_image(&mut self, record: &ImageRecord, dest: Rect, opacity: u8);
    /// Draw a single line of text anchored at `position`
    fn draw_text(&mut self, text: &str, position: (f32, f32), color: Rgb, font: FontSpec);
    fn present(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    /// `position` is the top-left corner
    Left,
    /// `position` is the top-center point
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub size: f32,
    pub align: TextAlign,
}

impl FontSpec {
    pub const TITLE: FontSpec = FontSpec { size: 36.0, align: TextAlign::Center };
    pub const BODY: FontSpec = FontSpec { size: 18.0, align: TextAlign::Center };
    pub const CAPTION: FontSpec = FontSpec { size: 14.0, align: TextAlign::Center };
}

/// Which screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Welcome,
    Grid,
    Slideshow,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Idle,
    FadingIn,
    FadingOut,
    Sliding,
}

/// Read-only view of the machine, for the host and for tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub mode: Mode,
    pub current_index: usize,
    pub transition_phase: TransitionPhase,
    /// Completed share of the running transition, 0.0..=1.0
    pub phase_progress: f32,
    pub grid_page: usize,
}

/// Whether the host should keep running the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WelcomePhase {
    FadingIn(Fade),
    Waiting,
    FadingOut(Fade),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SlidePhase {
    Entering(Transition),
    Showing,
    Leaving(Fade, Direction),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Screen {
    Welcome(WelcomePhase),
    Grid,
    Slideshow(SlidePhase),
    Terminal,
}

const WELCOME_TITLE: &str = "Portfolio";
const WELCOME_HINT: &str = "Press any key to continue";
/// Height reserved under each grid thumbnail for its caption
const CAPTION_STRIP: f32 = 22.0;

pub struct ViewStateMachine {
    catalog: Arc<Catalog>,
    settings: Settings,
    bindings: KeyBindings,
    screen: Screen,
    current_index: usize,
    grid_page: usize,
    pager: GridPager,
    layout: LayoutCache,
    export_requested: bool,
    last_geometry_error: Option<String>,
}

impl ViewStateMachine {
    pub fn new(catalog: Arc<Catalog>, settings: Settings) -> Result<Self, AppError> {
        if catalog.is_empty() {
            return Err(AppError::EmptyCatalog);
        }
        settings.validate()?;

        let screen = if settings.show_welcome {
            Screen::Welcome(WelcomePhase::FadingIn(Fade::fade_in(settings.transition_speed)))
        } else {
            Screen::Grid
        };

        Ok(Self {
            bindings: KeyBindings::new(&settings.keybindings),
            pager: GridPager::new(settings.grid_layout, catalog.len()),
            catalog,
            settings,
            screen,
            current_index: 0,
            grid_page: 0,
            layout: LayoutCache::new(),
            export_requested: false,
            last_geometry_error: None,
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.screen, Screen::Terminal)
    }

    pub fn state(&self) -> ViewState {
        let (mode, transition_phase, phase_progress) = match &self.screen {
            Screen::Welcome(WelcomePhase::FadingIn(fade)) => {
                (Mode::Welcome, TransitionPhase::FadingIn, Transition::Fade(*fade).fraction())
            }
            Screen::Welcome(WelcomePhase::Waiting) => (Mode::Welcome, TransitionPhase::Idle, 1.0),
            Screen::Welcome(WelcomePhase::FadingOut(fade)) => {
                (Mode::Welcome, TransitionPhase::FadingOut, Transition::Fade(*fade).fraction())
            }
            Screen::Grid => (Mode::Grid, TransitionPhase::Idle, 1.0),
            Screen::Slideshow(SlidePhase::Entering(t)) => {
                let phase = match t {
                    Transition::Fade(_) => TransitionPhase::FadingIn,
                    Transition::Slide(_) => TransitionPhase::Sliding,
                };
                (Mode::Slideshow, phase, t.fraction())
            }
            Screen::Slideshow(SlidePhase::Showing) => (Mode::Slideshow, TransitionPhase::Idle, 1.0),
            Screen::Slideshow(SlidePhase::Leaving(fade, _)) => {
                (Mode::Slideshow, TransitionPhase::FadingOut, Transition::Fade(*fade).fraction())
            }
            Screen::Terminal => (Mode::Terminal, TransitionPhase::Idle, 1.0),
        };

        ViewState {
            mode,
            current_index: self.current_index,
            transition_phase,
            phase_progress,
            grid_page: self.grid_page,
        }
    }

    /// Returns true once per export key press
    pub fn take_export_request(&mut self) -> bool {
        std::mem::take(&mut self.export_requested)
    }

    /// Draw the current frame again without advancing or reading input.
    ///
    /// For hosts whose UI pass can run more than once per frame.
    pub fn redraw(&mut self, viewport_w: f32, viewport_h: f32, renderer: &mut dyn Renderer) {
        if !self.is_terminal() {
            self.draw(viewport_w, viewport_h, renderer);
        }
    }

    /// Run one frame: advance the active transition, draw, then apply input.
    pub fn tick<I>(&mut self, viewport_w: f32, viewport_h: f32, events: I, renderer: &mut dyn Renderer) -> Flow
    where
        I: IntoIterator<Item = InputEvent>,
    {
        if self.is_terminal() {
            return Flow::Exit;
        }

        self.advance(viewport_w);
        self.draw(viewport_w, viewport_h, renderer);

        for event in events {
            self.handle(event, viewport_w, viewport_h);
            if self.is_terminal() {
                break;
            }
        }

        if self.is_terminal() {
            Flow::Exit
        } else {
            Flow::Continue
        }
    }

    fn speed(&self) -> u32 {
        self.settings.transition_speed
    }

    fn entering_transition(&self, viewport_w: f32) -> Transition {
        match self.settings.transition_style {
            TransitionStyle::Fade => Transition::Fade(Fade::fade_in(self.speed())),
            TransitionStyle::Slide => Transition::Slide(Slide::new(viewport_w, self.speed() as f32)),
        }
    }

    fn advance(&mut self, viewport_w: f32) {
        self.screen = match self.screen {
            Screen::Welcome(WelcomePhase::FadingIn(fade)) => match fade.step() {
                (_, true) => Screen::Welcome(WelcomePhase::Waiting),
                (next, false) => Screen::Welcome(WelcomePhase::FadingIn(next)),
            },
            Screen::Welcome(WelcomePhase::FadingOut(fade)) => match fade.step() {
                (_, true) => {
                    tracing::debug!("Welcome dismissed");
                    Screen::Grid
                }
                (next, false) => Screen::Welcome(WelcomePhase::FadingOut(next)),
            },
            Screen::Slideshow(SlidePhase::Entering(mut transition)) => {
                if transition.advance() {
                    Screen::Slideshow(SlidePhase::Showing)
                } else {
                    Screen::Slideshow(SlidePhase::Entering(transition))
                }
            }
            Screen::Slideshow(SlidePhase::Leaving(fade, direction)) => match fade.step() {
                (_, true) => {
                    self.current_index = self.wrap(direction);
                    tracing::debug!("Showing image {}", self.current_index);
                    Screen::Slideshow(SlidePhase::Entering(self.entering_transition(viewport_w)))
                }
                (next, false) => Screen::Slideshow(SlidePhase::Leaving(next, direction)),
            },
            other => other,
        };
    }

    fn wrap(&self, direction: Direction) -> usize {
        let n = self.catalog.len();
        match direction {
            Direction::Forward => (self.current_index + 1) % n,
            Direction::Backward => (self.current_index + n - 1) % n,
        }
    }

    fn handle(&mut self, event: InputEvent, viewport_w: f32, viewport_h: f32) {
        let command = match &event {
            InputEvent::Quit => Some(Command::Quit),
            InputEvent::Key(name) => self.bindings.resolve(name),
            InputEvent::MouseClick { .. } => None,
        };

        if matches!(command, Some(Command::Quit | Command::Cancel)) {
            tracing::info!("Session ended by {:?}", event);
            self.screen = Screen::Terminal;
            return;
        }

        match self.screen {
            Screen::Welcome(WelcomePhase::Waiting) => {
                self.screen = Screen::Welcome(WelcomePhase::FadingOut(Fade::fade_out(self.speed())));
            }
            Screen::Grid => match (command, event) {
                (Some(Command::NextPage), _) => self.grid_page = self.pager.next_page(self.grid_page),
                (Some(Command::PreviousPage), _) => self.grid_page = self.pager.previous_page(self.grid_page),
                (Some(Command::Export), _) => self.request_export(),
                (_, InputEvent::MouseClick { x, y }) => self.click_grid(x, y, viewport_w, viewport_h),
                _ => {}
            },
            Screen::Slideshow(SlidePhase::Showing) => match command {
                Some(Command::Next) => {
                    self.screen = Screen::Slideshow(SlidePhase::Leaving(Fade::fade_out(self.speed()), Direction::Forward));
                }
                Some(Command::Previous) => {
                    self.screen = Screen::Slideshow(SlidePhase::Leaving(Fade::fade_out(self.speed()), Direction::Backward));
                }
                Some(Command::ToggleGrid) => {
                    self.grid_page = self.pager.page_of(self.current_index);
                    self.screen = Screen::Grid;
                }
                Some(Command::Export) => self.request_export(),
                _ => {}
            },
            // Transitions run to completion; everything else is dropped.
            _ => {}
        }
    }

    fn request_export(&mut self) {
        tracing::info!("Export requested");
        self.export_requested = true;
    }

    fn page_item_count(&self) -> usize {
        self.pager.page_range(self.grid_page).len()
    }

    fn grid_rects(&mut self, viewport_w: f32, viewport_h: f32) -> Result<Vec<Rect>, AppError> {
        let grid: GridLayout = self.settings.grid_layout;
        let margin = self.settings.grid_margin as f32;
        let count = self.page_item_count();
        self.layout
            .grid(viewport_w, viewport_h, grid, margin, count)
            .map(|rects| rects.to_vec())
    }

    fn click_grid(&mut self, x: f32, y: f32, viewport_w: f32, viewport_h: f32) {
        let Ok(rects) = self.grid_rects(viewport_w, viewport_h) else {
            return;
        };
        let Some(cell) = hit_test(&rects, x, y) else {
            return;
        };

        let index = self.pager.page_range(self.grid_page).start + cell;
        tracing::debug!("Opening image {} from grid cell {}", index, cell);
        self.current_index = index;
        self.screen = Screen::Slideshow(SlidePhase::Entering(self.entering_transition(viewport_w)));
    }

    fn report_geometry(&mut self, err: &AppError) {
        let message = err.to_string();
        if self.last_geometry_error.as_deref() != Some(message.as_str()) {
            tracing::warn!("{}", message);
            self.last_geometry_error = Some(message);
        }
    }

    fn draw(&mut self, viewport_w: f32, viewport_h: f32, renderer: &mut dyn Renderer) {
        let background = self.settings.background_color;
        renderer.clear(background);

        match self.screen {
            Screen::Welcome(phase) => {
                let opacity = match phase {
                    WelcomePhase::FadingIn(fade) | WelcomePhase::FadingOut(fade) => fade.opacity(),
                    WelcomePhase::Waiting => 255,
                };
                let color = blend(background, text_color(background), opacity);
                let (cx, cy) = (viewport_w / 2.0, viewport_h / 2.0);
                renderer.draw_text(WELCOME_TITLE, (cx, cy - FontSpec::TITLE.size), color, FontSpec::TITLE);
                renderer.draw_text(WELCOME_HINT, (cx, cy + FontSpec::BODY.size), color, FontSpec::BODY);
            }
            Screen::Grid => self.draw_grid(viewport_w, viewport_h, renderer),
            Screen::Slideshow(phase) => {
                let (opacity, offset_x) = match phase {
                    SlidePhase::Entering(t) => (t.opacity(), t.offset_x()),
                    SlidePhase::Showing => (255, 0.0),
                    SlidePhase::Leaving(fade, _) => (fade.opacity(), 0.0),
                };
                self.draw_slide(viewport_w, viewport_h, opacity, offset_x, renderer);
            }
            Screen::Terminal => {}
        }

        renderer.present();
    }

    fn draw_grid(&mut self, viewport_w: f32, viewport_h: f32, renderer: &mut dyn Renderer) {
        let color = text_color(self.settings.background_color);

        let rects = match self.grid_rects(viewport_w, viewport_h) {
            Ok(rects) => rects,
            Err(e) => {
                self.report_geometry(&e);
                renderer.draw_text(
                    "Window too small",
                    (viewport_w / 2.0, viewport_h / 2.0),
                    color,
                    FontSpec::BODY,
                );
                return;
            }
        };

        let catalog = Arc::clone(&self.catalog);
        let start = self.pager.page_range(self.grid_page).start;
        for (cell, rect) in rects.iter().enumerate() {
            let Some(record) = catalog.get(start + cell) else {
                continue;
            };

            let strip = CAPTION_STRIP.min(rect.height / 4.0);
            let bounds = Rect::new(rect.x, rect.y, rect.width, rect.height - strip);
            let caption_pos = (rect.center().0, rect.bottom() - strip);

            match fit_rect_within(record.width, record.height, bounds) {
                Ok(dest) => {
                    renderer.draw_image(record, dest, 255);
                    renderer.draw_text(&record.caption, caption_pos, color, FontSpec::CAPTION);
                }
                Err(e) => {
                    self.report_geometry(&e);
                    renderer.draw_text(&placeholder(record), caption_pos, color, FontSpec::CAPTION);
                }
            }
        }
    }

    fn draw_slide(&mut self, viewport_w: f32, viewport_h: f32, opacity: u8, offset_x: f32, renderer: &mut dyn Renderer) {
        let catalog = Arc::clone(&self.catalog);
        let Some(record) = catalog.get(self.current_index) else {
            return;
        };
        let background = self.settings.background_color;
        let color = blend(background, text_color(background), opacity);
        let caption = format!("{}  ({}/{})", record.caption, record.index + 1, catalog.len());
        let caption_pos = (viewport_w / 2.0 + offset_x, viewport_h - 2.0 * CAPTION_STRIP);

        match fit_rect(record.width, record.height, viewport_w, viewport_h) {
            Ok(dest) => {
                renderer.draw_image(record, dest.translate(offset_x, 0.0), opacity);
                renderer.draw_text(&caption, caption_pos, color, FontSpec::CAPTION);
            }
            Err(e) => {
                self.report_geometry(&e);
                renderer.draw_text(&placeholder(record), (viewport_w / 2.0, viewport_h / 2.0), color, FontSpec::BODY);
            }
        }
    }
}

fn placeholder(record: &ImageRecord) -> String {
    format!("{} (cannot display)", record.caption)
}

/// Black or white, whichever reads better on `background`
pub fn text_color(background: Rgb) -> Rgb {
    let luma = 299 * background.r() as u32 + 587 * background.g() as u32 + 114 * background.b() as u32;
    if luma > 128_000 {
        Rgb::BLACK
    } else {
        Rgb::WHITE
    }
}

/// Mix `to` over `from` with `alpha` 0..=255
fn blend(from: Rgb, to: Rgb, alpha: u8) -> Rgb {
    let mix = |a: u8, b: u8| ((a as u32 * (255 - alpha as u32) + b as u32 * alpha as u32) / 255) as u8;
    Rgb([mix(from.r(), to.r()), mix(from.g(), to.g()), mix(from.b(), to.b())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_catalog;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Clear(Rgb),
        Image { index: usize, dest: Rect, opacity: u8 },
        Text(String),
        Present,
    }

    #[derive(Default)]
    struct RecordingRenderer {
        ops: Vec<Op>,
    }

    impl RecordingRenderer {
        fn images(&self) -> Vec<(usize, Rect, u8)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Image { index, dest, opacity } => Some((*index, *dest, *opacity)),
                    _ => None,
                })
                .collect()
        }

        fn texts(&self) -> Vec<&str> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Renderer for RecordingRenderer {
        fn clear(&mut self, color: Rgb) {
            self.ops.push(Op::Clear(color));
        }

        fn draw_image(&mut self, record: &ImageRecord, dest: Rect, opacity: u8) {
            self.ops.push(Op::Image { index: record.index, dest, opacity });
        }

        fn draw_text(&mut self, text: &str, _: (f32, f32), _: Rgb, _: FontSpec) {
            self.ops.push(Op::Text(text.to_string()));
        }

        fn present(&mut self) {
            self.ops.push(Op::Present);
        }
    }

    const W: f32 = 800.0;
    const H: f32 = 600.0;

    fn settings() -> Settings {
        Settings {
            show_welcome: false,
            ..Settings::default()
        }
    }

    fn machine(sizes: &[(u32, u32, &str)], settings: Settings) -> ViewStateMachine {
        ViewStateMachine::new(Arc::new(test_catalog(sizes)), settings).unwrap()
    }

    fn key(name: &str) -> Vec<InputEvent> {
        vec![InputEvent::Key(name.to_string())]
    }

    fn tick(m: &mut ViewStateMachine, events: Vec<InputEvent>) -> Flow {
        m.tick(W, H, events, &mut RecordingRenderer::default())
    }

    fn settle(m: &mut ViewStateMachine) {
        for _ in 0..1000 {
            if m.state().transition_phase == TransitionPhase::Idle {
                return;
            }
            tick(m, vec![]);
        }
        panic!("transition never finished: {:?}", m.state());
    }

    fn open(m: &mut ViewStateMachine, x: f32, y: f32) {
        tick(m, vec![InputEvent::MouseClick { x, y }]);
        settle(m);
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let err = ViewStateMachine::new(Arc::new(Catalog::new()), settings()).err().unwrap();
        assert!(matches!(err, AppError::EmptyCatalog));
    }

    #[test]
    fn test_two_image_scenario() {
        let mut m = machine(&[(400, 300, "a"), (300, 400, "b")], settings());
        let mut r = RecordingRenderer::default();
        m.tick(W, H, vec![], &mut r);

        // Default 3x2 grid with a 10px margin: cells of 253x285.
        let cells: Vec<Rect> = r.images().iter().map(|(_, dest, _)| *dest).collect();
        assert_eq!(cells.len(), 2);
        let cell0 = Rect::new(10.0, 10.0, 253.0, 285.0);
        let cell1 = Rect::new(273.0, 10.0, 253.0, 285.0);
        assert!(cell0.contains_rect(&cells[0], 1e-3));
        assert!(cell1.contains_rect(&cells[1], 1e-3));
        assert_eq!(r.texts(), vec!["a", "b"]);

        let (cx, cy) = cell1.center();
        open(&mut m, cx, cy);
        assert_eq!(m.state().mode, Mode::Slideshow);
        assert_eq!(m.state().current_index, 1);

        tick(&mut m, key("Right"));
        settle(&mut m);
        assert_eq!(m.state().current_index, 0);

        tick(&mut m, key("Left"));
        settle(&mut m);
        assert_eq!(m.state().current_index, 1);
    }

    #[test]
    fn test_click_outside_cells_is_ignored() {
        let mut m = machine(&[(10, 10, "a")], settings());
        tick(&mut m, vec![InputEvent::MouseClick { x: 5.0, y: 5.0 }]);
        tick(&mut m, vec![InputEvent::MouseClick { x: 600.0, y: 100.0 }]);
        assert_eq!(m.state().mode, Mode::Grid);
    }

    #[test]
    fn test_navigation_is_cyclic() {
        for n in 1..=4usize {
            let sizes: Vec<(u32, u32, &str)> = (0..n).map(|_| (10, 10, "x")).collect();
            let mut m = machine(&sizes, Settings { transition_speed: 255, ..settings() });
            open(&mut m, 20.0, 20.0);

            for _ in 0..n {
                tick(&mut m, key("Right"));
                settle(&mut m);
            }
            assert_eq!(m.state().current_index, 0, "n = {}", n);

            for k in 1..=n {
                tick(&mut m, key("Left"));
                settle(&mut m);
                assert_eq!(m.state().current_index, (n - k % n) % n);
            }
            for _ in 0..3 {
                tick(&mut m, key("Right"));
                settle(&mut m);
            }
            for _ in 0..3 {
                tick(&mut m, key("Left"));
                settle(&mut m);
            }
            assert_eq!(m.state().current_index, 0);
        }
    }

    #[test]
    fn test_fade_out_completes_before_index_changes() {
        let mut m = machine(&[(10, 10, "a"), (10, 10, "b")], settings());
        open(&mut m, 20.0, 20.0);
        tick(&mut m, key("Right"));

        let mut opacities = Vec::new();
        loop {
            let mut r = RecordingRenderer::default();
            m.tick(W, H, vec![], &mut r);
            let state = m.state();
            if state.transition_phase != TransitionPhase::FadingOut {
                assert_eq!(state.current_index, 1);
                assert_eq!(state.transition_phase, TransitionPhase::FadingIn);
                break;
            }
            assert_eq!(state.current_index, 0);
            opacities.push(r.images()[0].2);
        }

        assert!(opacities.windows(2).all(|w| w[0] > w[1]));
        // ceil(255 / 20) steps, the last one finishing the fade
        assert_eq!(opacities.len(), 12);
    }

    #[test]
    fn test_navigation_ignored_mid_transition() {
        let mut m = machine(&[(10, 10, "a"), (10, 10, "b"), (10, 10, "c")], settings());
        tick(&mut m, vec![InputEvent::MouseClick { x: 20.0, y: 20.0 }]);
        assert_eq!(m.state().transition_phase, TransitionPhase::FadingIn);

        tick(&mut m, key("Right"));
        tick(&mut m, key("g"));
        settle(&mut m);
        assert_eq!(m.state().mode, Mode::Slideshow);
        assert_eq!(m.state().current_index, 0);
    }

    #[test]
    fn test_quit_and_cancel_from_any_state() {
        let mut m = machine(&[(10, 10, "a")], Settings::default());
        assert_eq!(m.state().mode, Mode::Welcome);
        assert_eq!(tick(&mut m, key("Escape")), Flow::Exit);
        assert_eq!(m.state().mode, Mode::Terminal);
        assert_eq!(tick(&mut m, key("Right")), Flow::Exit);

        let mut m = machine(&[(10, 10, "a")], settings());
        tick(&mut m, vec![InputEvent::MouseClick { x: 20.0, y: 20.0 }]);
        assert_eq!(m.state().transition_phase, TransitionPhase::FadingIn);
        assert_eq!(tick(&mut m, vec![InputEvent::Quit]), Flow::Exit);
        assert!(m.is_terminal());
    }

    #[test]
    fn test_events_after_quit_are_dropped() {
        let mut m = machine(&[(10, 10, "a")], settings());
        let flow = tick(&mut m, vec![InputEvent::Key("q".into()), InputEvent::MouseClick { x: 20.0, y: 20.0 }]);
        assert_eq!(flow, Flow::Exit);
        assert_eq!(m.state().mode, Mode::Terminal);
    }

    #[test]
    fn test_welcome_overlay() {
        let mut m = machine(&[(10, 10, "a")], Settings::default());

        // Input during the fade-in is ignored.
        tick(&mut m, key("x"));
        assert_eq!(m.state().mode, Mode::Welcome);
        assert_eq!(m.state().transition_phase, TransitionPhase::FadingIn);

        settle(&mut m);
        assert_eq!(m.state().mode, Mode::Welcome);

        tick(&mut m, key("x"));
        assert_eq!(m.state().transition_phase, TransitionPhase::FadingOut);
        settle(&mut m);
        assert_eq!(m.state().mode, Mode::Grid);
    }

    #[test]
    fn test_toggle_grid_follows_current_page() {
        let sizes: Vec<(u32, u32, &str)> = (0..8).map(|_| (10, 10, "x")).collect();
        let mut m = machine(&sizes, settings());

        tick(&mut m, key("PageDown"));
        assert_eq!(m.state().grid_page, 1);

        let mut r = RecordingRenderer::default();
        m.tick(W, H, vec![], &mut r);
        let shown: Vec<usize> = r.images().iter().map(|(i, _, _)| *i).collect();
        assert_eq!(shown, vec![6, 7]);

        open(&mut m, 20.0, 20.0);
        assert_eq!(m.state().current_index, 6);

        tick(&mut m, key("Right"));
        settle(&mut m);
        tick(&mut m, key("g"));
        assert_eq!(m.state().mode, Mode::Grid);
        assert_eq!(m.state().grid_page, 1);

        tick(&mut m, key("PageDown"));
        assert_eq!(m.state().grid_page, 0);
        tick(&mut m, key("PageUp"));
        assert_eq!(m.state().grid_page, 1);
    }

    #[test]
    fn test_export_request_keeps_state() {
        let mut m = machine(&[(10, 10, "a")], settings());
        let before = m.state();
        tick(&mut m, key("e"));
        assert_eq!(m.state(), before);
        assert!(m.take_export_request());
        assert!(!m.take_export_request());
    }

    #[test]
    fn test_slide_entry() {
        let s = Settings {
            transition_style: TransitionStyle::Slide,
            ..settings()
        };
        let mut m = machine(&[(400, 300, "a")], s);
        tick(&mut m, vec![InputEvent::MouseClick { x: 20.0, y: 20.0 }]);

        let mut lefts = Vec::new();
        while m.state().transition_phase == TransitionPhase::Sliding {
            let mut r = RecordingRenderer::default();
            m.tick(W, H, vec![], &mut r);
            let (_, dest, opacity) = r.images()[0];
            assert_eq!(opacity, 255);
            lefts.push(dest.x);
        }

        assert!(lefts.windows(2).all(|w| w[0] < w[1]));
        // transition_speed is the per-frame pixel step
        assert_eq!(lefts[1] - lefts[0], 20.0);
        let settled = fit_rect(400, 300, W, H).unwrap();
        assert_eq!(*lefts.last().unwrap(), settled.x);
        assert_eq!(m.state().transition_phase, TransitionPhase::Idle);
    }

    #[test]
    fn test_redraw_does_not_advance() {
        let mut m = machine(&[(400, 300, "a")], settings());
        tick(&mut m, vec![InputEvent::MouseClick { x: 20.0, y: 20.0 }]);
        let mut first = RecordingRenderer::default();
        m.tick(W, H, vec![], &mut first);
        let before = m.state();

        let mut again = RecordingRenderer::default();
        m.redraw(W, H, &mut again);
        assert_eq!(m.state(), before);
        assert_eq!(again.ops, first.ops);
    }

    #[test]
    fn test_rebinding_one_command_keeps_cancel() {
        let s: Settings = toml::from_str("show_welcome = false\n[keybindings]\n\"view.next\" = [\"j\"]\n").unwrap();
        let mut m = machine(&[(10, 10, "a"), (10, 10, "b")], Settings { transition_speed: 255, ..s });
        open(&mut m, 20.0, 20.0);

        tick(&mut m, key("j"));
        settle(&mut m);
        assert_eq!(m.state().current_index, 1);

        assert_eq!(tick(&mut m, key("Escape")), Flow::Exit);
        assert!(m.is_terminal());
    }

    #[test]
    fn test_unsized_image_in_slideshow_draws_placeholder() {
        let mut m = machine(&[(0, 10, "blank")], settings());
        tick(&mut m, vec![InputEvent::MouseClick { x: 20.0, y: 20.0 }]);
        assert_eq!(m.state().mode, Mode::Slideshow);

        for _ in 0..3 {
            let mut r = RecordingRenderer::default();
            assert_eq!(m.tick(W, H, vec![], &mut r), Flow::Continue);
            assert!(r.images().is_empty());
            assert_eq!(r.texts(), vec!["blank (cannot display)"]);
            assert_eq!(r.ops.last(), Some(&Op::Present));
        }

        settle(&mut m);
        assert_eq!(tick(&mut m, key("Escape")), Flow::Exit);
    }

    #[test]
    fn test_tiny_viewport_draws_placeholder() {
        let mut m = machine(&[(10, 10, "a")], settings());
        let mut r = RecordingRenderer::default();
        assert_eq!(m.tick(20.0, 20.0, vec![], &mut r), Flow::Continue);
        assert!(r.images().is_empty());
        assert_eq!(r.texts(), vec!["Window too small"]);
        assert_eq!(r.ops.first(), Some(&Op::Clear(Rgb::BLACK)));
        assert_eq!(r.ops.last(), Some(&Op::Present));
    }

    #[test]
    fn test_text_color_contrast() {
        assert_eq!(text_color(Rgb::BLACK), Rgb::WHITE);
        assert_eq!(text_color(Rgb::WHITE), Rgb::BLACK);
        assert_eq!(blend(Rgb::BLACK, Rgb::WHITE, 0), Rgb::BLACK);
        assert_eq!(blend(Rgb::BLACK, Rgb::WHITE, 255), Rgb::WHITE);
    }
}
