use crate::outline;
use anyhow::{Context, Result, anyhow};
use log::{debug, info, trace};
use lopdf::{Document, Object, ObjectId, dictionary};
use std::path::Path;

const OUTPUT_PDF_VERSION: &str = "1.7";

/// Accumulates PDF documents into a single output document.
///
/// Documents are appended one after the other; the page tree of each appended
/// document is grafted, unchanged, under the root page tree of the session, so
/// the pages of every document keep their order and documents keep the order
/// in which they were appended. The outline of each document follows its pages.
///
/// Sources are read whole by [`PdfMerger::append`], so the session never keeps
/// input files open. It is consumed by [`PdfMerger::write`].
pub struct PdfMerger {
    doc: Document,
    pages_root_id: ObjectId,
    outline_items: Vec<ObjectId>,
    num_documents: usize,
    num_pages: usize,
    with_outlines: bool,
}

impl PdfMerger {
    pub fn new() -> Result<Self> {
        let mut doc = Document::with_version(OUTPUT_PDF_VERSION);
        let pages_root_id = initialise_doc_with_null_pages(&mut doc)?;

        Ok(Self {
            doc,
            pages_root_id,
            outline_items: Vec::new(),
            num_documents: 0,
            num_pages: 0,
            with_outlines: false,
        })
    }

    /// Add an outline entry per appended document, named after its file. The
    /// outline the document already had is nested below that entry.
    pub fn with_outlines(mut self, with_outlines: bool) -> Self {
        self.with_outlines = with_outlines;
        self
    }

    pub fn document_count(&self) -> usize {
        self.num_documents
    }

    pub fn page_count(&self) -> usize {
        self.num_pages
    }

    /// Loads the PDF at `path` and appends all its pages after the ones already
    /// in the session. Returns the number of pages appended.
    pub fn append(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        trace!("Appending '{}' to the merge session", path.display());

        let mut source = Document::load(path)
            .with_context(|| format!("could not load '{}'", path.display()))?;
        source.renumber_objects_with(self.doc.max_id + 1);

        let (source_catalog_id, source_pages_root_id) = page_tree_root(&source)
            .with_context(|| format!("'{}' has no usable page tree", path.display()))?;

        let resolved = outline::resolve_named_destinations(&mut source)?;
        if resolved > 0 {
            debug!("Resolved {resolved} named destinations in '{}'", path.display());
        }
        let source_outline_items = outline::top_level_items(&source);

        let source_pages = source.get_pages();
        let imported_pages = source_pages.len();
        let first_page_id = source_pages.get(&1).copied();
        let source_max_id = source.max_id;

        for (object_id, object) in source.objects {
            if object_id == source_catalog_id {
                continue;
            }
            match object.type_name().unwrap_or(b"") {
                b"XRef" | b"ObjStm" | b"Outlines" => {}
                _ => {
                    self.doc.objects.insert(object_id, object);
                }
            }
        }
        self.doc.max_id = self.doc.max_id.max(source_max_id);

        self.doc
            .get_object_mut(source_pages_root_id)?
            .as_dict_mut()?
            .set("Parent", Object::Reference(self.pages_root_id));

        let pages_root = self.doc.get_object_mut(self.pages_root_id)?.as_dict_mut()?;
        let count = pages_root.get(b"Count")?.as_i64()? + imported_pages as i64;
        pages_root.set("Count", Object::Integer(count));
        pages_root
            .get_mut(b"Kids")?
            .as_array_mut()?
            .push(Object::Reference(source_pages_root_id));

        match (self.with_outlines, first_page_id) {
            (true, Some(first_page_id)) => {
                let title = path
                    .file_name()
                    .ok_or(anyhow!(
                        "The given path '{}' does not contain a filename",
                        path.display()
                    ))?
                    .to_string_lossy()
                    .to_string();
                let entry_id =
                    outline::add_entry(&mut self.doc, &title, first_page_id, &source_outline_items)?;
                self.outline_items.push(entry_id);
            }
            (true, None) => {
                debug!("'{}' has no pages, no outline entry added", path.display());
                self.outline_items.extend(source_outline_items);
            }
            (false, _) => self.outline_items.extend(source_outline_items),
        }

        self.num_documents += 1;
        self.num_pages += imported_pages;
        debug!(
            "Appended {imported_pages} pages from '{}' ({} pages in session)",
            path.display(),
            self.num_pages
        );

        Ok(imported_pages)
    }

    /// Serializes the session to `output_path`, creating or overwriting the file.
    ///
    /// The write is not atomic: a failure half-way may leave a partial file behind.
    pub fn write(mut self, output_path: impl AsRef<Path>) -> Result<()> {
        let output_path = output_path.as_ref();

        if !self.outline_items.is_empty() {
            info!("Attach the outline of the combined document to the catalog");
            let outlines_id = self.doc.new_object_id();
            let mut outlines = dictionary! { "Type" => "Outlines" };
            outline::link_children(&mut self.doc, outlines_id, &self.outline_items, &mut outlines)?;
            self.doc.objects.insert(outlines_id, Object::Dictionary(outlines));

            let catalog = self.doc.catalog_mut()?;
            catalog.set("Outlines", Object::Reference(outlines_id));
            if self.with_outlines {
                catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
            }
        }

        self.doc
            .save(output_path)
            .with_context(|| format!("could not write '{}'", output_path.display()))?;
        info!(
            "Wrote {} pages from {} documents to '{}'",
            self.num_pages,
            self.num_documents,
            output_path.display()
        );

        Ok(())
    }
}

fn initialise_doc_with_null_pages(doc: &mut Document) -> Result<ObjectId> {
    let main_pages_root = dictionary!(
        b"Type" => Object::Name(b"Pages".to_vec()),
        b"Kids" => Object::Array(vec![]),
        b"Count" => Object::Integer(0)
    );

    let main_root_pages_id = doc.add_object(Object::Dictionary(main_pages_root));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(main_root_pages_id)
    });
    doc.trailer.set("Root", catalog_id);

    Ok(main_root_pages_id)
}

/// Ids of the catalog and of the root of the page tree.
fn page_tree_root(doc: &Document) -> Result<(ObjectId, ObjectId)> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    let pages_root_id = doc.catalog()?.get(b"Pages")?.as_reference()?;
    Ok((catalog_id, pages_root_id))
}
