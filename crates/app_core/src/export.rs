//! Export the catalog as a paginated document, one image per page

use crate::catalog::{Catalog, ImageRecord};
use crate::layout::{fit_rect_within, Rect};
use crate::AppError;
use crossbeam_channel::{Receiver, TryRecvError};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Page geometry, in points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Space kept free above the image for the caption
    pub caption_band: f32,
    /// Distance from the caption baseline to the image top
    pub caption_offset: f32,
    pub caption_size: f32,
}

impl Default for PageSpec {
    /// A4 portrait
    fn default() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            margin: 36.0,
            caption_band: 28.0,
            caption_offset: 10.0,
            caption_size: 14.0,
        }
    }
}

impl PageSpec {
    /// Area images are fitted into
    pub fn image_bounds(&self) -> Rect {
        Rect::new(
            self.margin,
            self.margin + self.caption_band,
            self.width - 2.0 * self.margin,
            self.height - 2.0 * self.margin - self.caption_band,
        )
    }
}

/// Placement of one catalog entry on its page. Coordinates are top-left based.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub index: usize,
    pub image_rect: Rect,
    pub caption: String,
    /// Caption baseline start
    pub caption_pos: (f32, f32),
}

/// Lay out one page per catalog entry, in catalog order
pub fn paginate(catalog: &Catalog, spec: &PageSpec) -> Result<Vec<PageLayout>, AppError> {
    let bounds = spec.image_bounds();

    catalog
        .iter()
        .map(|record| {
            let image_rect = fit_rect_within(record.width, record.height, bounds).map_err(|e| {
                AppError::ExportFailure(format!("page {} ({}): {}", record.index + 1, record.caption, e))
            })?;
            Ok(PageLayout {
                index: record.index,
                image_rect,
                caption: record.caption.clone(),
                caption_pos: (image_rect.x, image_rect.y - spec.caption_offset),
            })
        })
        .collect()
}

/// Destination of an export
pub trait DocumentSink {
    fn begin_page(&mut self, width: f32, height: f32) -> Result<(), AppError>;
    fn place_image(&mut self, record: &ImageRecord, rect: Rect) -> Result<(), AppError>;
    fn place_caption(&mut self, text: &str, x: f32, y: f32, size: f32) -> Result<(), AppError>;
    fn end_page(&mut self) -> Result<(), AppError>;
    /// Flush the document; returns the number of pages written
    fn finish(&mut self) -> Result<usize, AppError>;
}

/// Shared flag to stop an export between pages
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Write every catalog entry to `sink`.
///
/// The first failing entry aborts the export; pages already handed to the
/// sink are not rolled back.
pub fn export(
    catalog: &Catalog,
    spec: &PageSpec,
    sink: &mut dyn DocumentSink,
    cancel: &CancelToken,
) -> Result<usize, AppError> {
    if catalog.is_empty() {
        return Err(AppError::EmptyCatalog);
    }

    let pages = paginate(catalog, spec)?;

    for page in &pages {
        if cancel.is_cancelled() {
            tracing::info!("Export cancelled after {} pages", page.index);
            return Err(AppError::ExportFailure("cancelled".into()));
        }

        let Some(record) = catalog.get(page.index) else {
            return Err(AppError::ExportFailure(format!("missing catalog entry {}", page.index)));
        };

        sink.begin_page(spec.width, spec.height)?;
        sink.place_caption(&page.caption, page.caption_pos.0, page.caption_pos.1, spec.caption_size)?;
        sink.place_image(record, page.image_rect)?;
        sink.end_page()?;
        tracing::debug!("Exported page {} ({})", page.index + 1, page.caption);
    }

    let written = sink.finish()?;
    tracing::info!("Export finished: {} pages", written);
    Ok(written)
}

struct PendingPage {
    width: f32,
    height: f32,
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

/// Writes pages into a PDF file
pub struct PdfSink {
    path: PathBuf,
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_ids: Vec<ObjectId>,
    current: Option<PendingPage>,
    image_count: usize,
}

impl PdfSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        Self {
            path: path.into(),
            doc,
            pages_id,
            font_id,
            page_ids: Vec::new(),
            current: None,
            image_count: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn page(&mut self) -> Result<&mut PendingPage, AppError> {
        self.current
            .as_mut()
            .ok_or_else(|| AppError::ExportFailure("no page in progress".into()))
    }
}

impl DocumentSink for PdfSink {
    fn begin_page(&mut self, width: f32, height: f32) -> Result<(), AppError> {
        if self.current.is_some() {
            return Err(AppError::ExportFailure("previous page was not finished".into()));
        }
        self.current = Some(PendingPage {
            width,
            height,
            operations: Vec::new(),
            xobjects: Dictionary::new(),
        });
        Ok(())
    }

    fn place_image(&mut self, record: &ImageRecord, rect: Rect) -> Result<(), AppError> {
        let pixels = record.handle.pixels();
        let (width, height) = (pixels.width(), pixels.height());
        let rgb: Vec<u8> = pixels
            .pixels()
            .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
            .collect();

        let mut image = image_dictionary(width, height, "DeviceRGB");

        // Transparent pixels go through a soft mask so the page shows through.
        if pixels.pixels().any(|p| p.0[3] < u8::MAX) {
            let alpha: Vec<u8> = pixels.pixels().map(|p| p.0[3]).collect();
            let mask = Stream::new(image_dictionary(width, height, "DeviceGray"), deflate(&alpha)?);
            image.set("SMask", self.doc.add_object(mask));
        }

        let image_id = self.doc.add_object(Stream::new(image, deflate(&rgb)?));
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let page = self.page()?;
        page.xobjects.set(name.as_str(), image_id);

        // PDF space has its origin bottom-left.
        let bottom = page.height - rect.bottom();
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    pt(rect.width),
                    pt(0.0),
                    pt(0.0),
                    pt(rect.height),
                    pt(rect.x),
                    pt(bottom),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn place_caption(&mut self, text: &str, x: f32, y: f32, size: f32) -> Result<(), AppError> {
        let page = self.page()?;
        let baseline = page.height - y;
        page.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), pt(size)]),
            Operation::new("Td", vec![pt(x), pt(baseline)]),
            Operation::new("Tj", vec![Object::string_literal(latin1(text))]),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), AppError> {
        let page = self
            .current
            .take()
            .ok_or_else(|| AppError::ExportFailure("no page in progress".into()))?;

        let content = Content {
            operations: page.operations,
        };
        let encoded = content
            .encode()
            .map_err(|e| AppError::ExportFailure(e.to_string()))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let resources = dictionary! {
            "Font" => dictionary! { "F1" => self.font_id },
            "XObject" => page.xobjects,
        };
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![pt(0.0), pt(0.0), pt(page.width), pt(page.height)],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, AppError> {
        if self.current.is_some() {
            return Err(AppError::ExportFailure("last page was not finished".into()));
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(self.page_ids.len() as i64),
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.doc
            .save(&self.path)
            .map_err(|e| AppError::ExportFailure(format!("{:?}: {}", self.path, e)))?;

        tracing::info!("Wrote {} pages to {:?}", self.page_ids.len(), self.path);
        Ok(self.page_ids.len())
    }
}

/// Whole points; sub-point precision is invisible on paper.
fn pt(value: f32) -> Object {
    Object::Integer(value.round() as i64)
}

fn image_dictionary(width: u32, height: u32, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(width as i64),
        "Height" => Object::Integer(height as i64),
        "ColorSpace" => color_space,
        "BitsPerComponent" => Object::Integer(8),
        "Filter" => "FlateDecode",
    }
}

fn deflate(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Helvetica/WinAnsi only covers Latin-1; anything else prints as '?'.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Summary of a finished export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub pages: usize,
}

/// A PDF export running on its own thread.
///
/// The catalog is shared read-only; the job never touches view state.
pub struct ExportJob {
    path: PathBuf,
    cancel: CancelToken,
    result_rx: Receiver<Result<ExportReport, AppError>>,
    handle: Option<JoinHandle<()>>,
}

impl ExportJob {
    pub fn spawn(catalog: Arc<Catalog>, spec: PageSpec, path: PathBuf) -> Self {
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let worker_path = path.clone();

        tracing::info!("Starting export of {} images to {:?}", catalog.len(), path);

        let handle = std::thread::spawn(move || {
            let mut sink = PdfSink::new(worker_path.clone());
            let result = export(&catalog, &spec, &mut sink, &worker_cancel).map(|pages| ExportReport {
                path: worker_path,
                pages,
            });
            let _ = result_tx.send(result);
        });

        Self {
            path,
            cancel,
            result_rx,
            handle: Some(handle),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking poll, for use from the frame loop
    pub fn try_result(&mut self) -> Option<Result<ExportReport, AppError>> {
        match self.result_rx.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(AppError::ExportFailure("export worker stopped unexpectedly".into())))
            }
        }
    }

    /// Block until the export finishes
    pub fn wait(mut self) -> Result<ExportReport, AppError> {
        let result = self
            .result_rx
            .recv()
            .unwrap_or_else(|_| Err(AppError::ExportFailure("export worker stopped unexpectedly".into())));
        self.join();
        result
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Export worker panicked");
            }
        }
    }
}
