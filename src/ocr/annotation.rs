//! Wire model of the document text annotation returned by the recognition
//! service (`fullTextAnnotation`). Only the fields the layout builder reads
//! are modelled; everything else is ignored on decode.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    #[serde(default)]
    pub pages: Vec<AnnotatedPage>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedPage {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub blocks: Vec<AnnotatedBlock>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedBlock {
    #[serde(default)]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub paragraphs: Vec<AnnotatedParagraph>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedParagraph {
    #[serde(default)]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub words: Vec<AnnotatedWord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedWord {
    #[serde(default)]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub symbols: Vec<AnnotatedSymbol>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedSymbol {
    #[serde(default)]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub property: Option<TextProperty>,
}

impl AnnotatedSymbol {
    pub fn detected_break(&self) -> Option<&DetectedBreak> {
        self.property.as_ref()?.detected_break.as_ref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextProperty {
    #[serde(default)]
    pub detected_break: Option<DetectedBreak>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedBreak {
    #[serde(rename = "type", default)]
    pub kind: BreakType,
    #[serde(default)]
    pub is_prefix: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakType {
    Space,
    SureSpace,
    EolSureSpace,
    Hyphen,
    LineBreak,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Polygon in pixel coordinates. Vertices run clockwise from the top-left
/// corner; the service omits zero coordinates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vertex {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl BoundingPoly {
    pub fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            vertices: vec![
                Vertex { x: x0, y: y0 },
                Vertex { x: x1, y: y0 },
                Vertex { x: x1, y: y1 },
                Vertex { x: x0, y: y1 },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_service_json() {
        let json = r#"{
            "text": "Hi",
            "pages": [{
                "width": 100, "height": 50,
                "blocks": [{
                    "paragraphs": [{
                        "boundingBox": {"vertices": [{"x": 1}, {"x": 9, "y": 0}, {"x": 9, "y": 8}, {"y": 8}]},
                        "words": [{
                            "symbols": [
                                {"text": "H"},
                                {"text": "i", "property": {"detectedBreak": {"type": "EOL_SURE_SPACE"}}},
                                {"text": "!", "property": {"detectedBreak": {"type": "SOMETHING_NEW", "isPrefix": true}}}
                            ]
                        }]
                    }]
                }]
            }]
        }"#;

        let annotation: TextAnnotation = serde_json::from_str(json).unwrap();
        let para = &annotation.pages[0].blocks[0].paragraphs[0];
        assert_eq!(para.bounding_box.as_ref().unwrap().vertices[0], Vertex { x: 1, y: 0 });

        let symbols = &para.words[0].symbols;
        assert_eq!(symbols[0].detected_break(), None);
        assert_eq!(symbols[1].detected_break().unwrap().kind, BreakType::EolSureSpace);
        let other = symbols[2].detected_break().unwrap();
        assert_eq!(other.kind, BreakType::Unknown);
        assert!(other.is_prefix);
    }
}
