use anyhow::{Result, anyhow, bail};
use lopdf::{
    Dictionary, Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};
use std::collections::BTreeMap;
use std::path::Path;

const A4_MEDIA_BOX: [i64; 4] = [0, 0, 595, 842];

/// Reloads the PDF at `pdf_file_path` and checks that its page tree holds
/// exactly `expected_pages` pages. Returns the reloaded document.
pub fn validate_pdf(pdf_file_path: impl AsRef<Path>, expected_pages: usize) -> Result<Document> {
    let pdf_file_path = pdf_file_path.as_ref();
    let doc = Document::load(pdf_file_path)?;

    let num_pages = doc.get_pages().len();
    if num_pages != expected_pages {
        bail!(
            "'{}' has {num_pages} pages, expected {expected_pages}",
            pdf_file_path.display()
        );
    }

    Ok(doc)
}

/// The first text operand shown on each page, in page order. Pages built by
/// [`get_basic_pdf_doc`] start with the name of their document.
pub fn page_titles(doc: &Document) -> Result<Vec<String>> {
    doc.get_pages()
        .values()
        .map(|&page_id| -> Result<String> {
            let content = Content::decode(&doc.get_page_content(page_id)?)?;
            content
                .operations
                .iter()
                .filter(|operation| operation.operator == "Tj")
                .find_map(|operation| match operation.operands.first() {
                    Some(Object::String(bytes, _)) => {
                        Some(String::from_utf8_lossy(bytes).to_string())
                    }
                    _ => None,
                })
                .ok_or(anyhow!("The page {page_id:?} shows no text"))
        })
        .collect()
}

/// Title and page number of each outline item in `items`. The page is `None`
/// when the item has no explicit destination inside `doc`.
pub fn outline_entries(doc: &Document, items: &[ObjectId]) -> Result<Vec<(String, Option<u32>)>> {
    let page_numbers: BTreeMap<ObjectId, u32> = doc
        .get_pages()
        .into_iter()
        .map(|(page_number, page_id)| (page_id, page_number))
        .collect();

    items
        .iter()
        .map(|&item_id| -> Result<(String, Option<u32>)> {
            let item = doc.get_dictionary(item_id)?;
            let title = match item.get(b"Title")? {
                Object::String(bytes, _) => String::from_utf8_lossy(bytes).to_string(),
                other => bail!("The outline item {item_id:?} has the title {other:?}"),
            };
            let page = match item.get(b"Dest") {
                Ok(Object::Array(destination)) => destination
                    .first()
                    .and_then(|page| page.as_reference().ok())
                    .and_then(|page_id| page_numbers.get(&page_id).copied()),
                _ => None,
            };
            Ok((title, page))
        })
        .collect()
}

/// Gives `doc` an outline with one `Section <n>` item per page. With `named`,
/// items point to their page through names resolved by the catalog `Dests`.
pub fn equip_with_outline(doc: &mut Document, named: bool) -> Result<()> {
    let outlines_id = doc.new_object_id();
    let mut named_dests = Dictionary::new();
    let mut items = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let explicit = Object::Array(vec![Object::Reference(page_id), "Fit".into()]);
        let destination = if named {
            let name = format!("section-{page_number}");
            named_dests.set(name.as_bytes().to_vec(), explicit);
            Object::Name(name.into_bytes())
        } else {
            explicit
        };

        items.push(doc.add_object(dictionary! {
            "Title" => Object::string_literal(format!("Section {page_number}")),
            "Parent" => outlines_id,
            "Dest" => destination,
        }));
    }

    for pair in items.windows(2) {
        doc.get_dictionary_mut(pair[0])?.set("Next", pair[1]);
        doc.get_dictionary_mut(pair[1])?.set("Prev", pair[0]);
    }

    let mut outlines = dictionary! {
        "Type" => "Outlines",
        "Count" => items.len() as i64,
    };
    if let (Some(&first_id), Some(&last_id)) = (items.first(), items.last()) {
        outlines.set("First", first_id);
        outlines.set("Last", last_id);
    }
    doc.objects.insert(outlines_id, Object::Dictionary(outlines));

    let catalog = doc.catalog_mut()?;
    catalog.set("Outlines", outlines_id);
    if named {
        catalog.set("Dests", Object::Dictionary(named_dests));
    }

    Ok(())
}

/// Writes a PDF of `num_pages` pages at `pdf_path`, every page titled with `doc_name`.
pub fn write_basic_pdf(pdf_path: impl AsRef<Path>, doc_name: &str, num_pages: u8) -> Result<()> {
    let mut pdf_doc = get_basic_pdf_doc(doc_name, num_pages)?;
    pdf_doc.save(pdf_path.as_ref())?;
    Ok(())
}

/// Get a PDF file with minimal features
pub fn get_basic_pdf_doc(doc_name: &str, num_pages: u8) -> Result<Document> {
    if doc_name.contains('/') {
        bail!("The document name provided contains a '/', not allowed!");
    }

    let mut doc = Document::with_version("1.7");
    let pages_root_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::with_capacity(num_pages.into());
    for page_number in 1..=num_pages {
        let lines = [
            doc_name.to_string(),
            format!("Page {page_number} of {num_pages}"),
            craft_random_text_of_len(20),
        ];
        let content_id = doc.add_object(Stream::new(dictionary! {}, encode_text_lines(&lines)?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_root_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let pages_root = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => i64::from(num_pages),
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "MediaBox" => A4_MEDIA_BOX.iter().map(|&bound| bound.into()).collect::<Vec<Object>>(),
    };
    doc.objects.insert(pages_root_id, Object::Dictionary(pages_root));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_root_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

/// One `Tj` per line, top-left of the page, moving down after each line.
fn encode_text_lines(lines: &[String]) -> Result<Vec<u8>> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 24.into()]),
        Operation::new("TL", vec![30.into()]),
        Operation::new("Td", vec![50.into(), 780.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    Ok(Content { operations }.encode()?)
}

pub fn craft_random_text_of_len(char_length: usize) -> String {
    use rand::distr::{Alphanumeric, SampleString};
    Alphanumeric.sample_string(&mut rand::rng(), char_length)
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn get_doc_10_pages() -> Result<()> {
        let document = get_basic_pdf_doc("doc_name", 10)?;
        let len = document.get_pages().len();

        assert_eq!(len, 10);

        Ok(())
    }

    #[test]
    fn written_doc_reloads_with_titles() -> Result<()> {
        let tmp = TempDir::new()?;
        let pdf_path = tmp.path().join("titled.pdf");

        write_basic_pdf(&pdf_path, "titled.pdf", 3)?;

        let doc = validate_pdf(&pdf_path, 3)?;
        assert_eq!(page_titles(&doc)?, vec!["titled.pdf"; 3]);
        assert!(validate_pdf(&pdf_path, 4).is_err());

        Ok(())
    }

    #[test]
    fn slash_in_name_rejected() {
        assert!(get_basic_pdf_doc("a/b", 1).is_err());
    }

    #[test]
    fn outline_survives_save() -> Result<()> {
        let tmp = TempDir::new()?;
        let pdf_path = tmp.path().join("outlined.pdf");
        let mut doc = get_basic_pdf_doc("outlined.pdf", 2)?;
        equip_with_outline(&mut doc, false)?;
        doc.save(&pdf_path)?;

        let reloaded = validate_pdf(&pdf_path, 2)?;
        let outlines_id = reloaded.catalog()?.get(b"Outlines")?.as_reference()?;
        let first_id = reloaded.get_dictionary(outlines_id)?.get(b"First")?.as_reference()?;
        assert_eq!(
            outline_entries(&reloaded, &[first_id])?,
            [("Section 1".to_string(), Some(1))]
        );

        Ok(())
    }
}
