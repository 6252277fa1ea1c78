//! The fixed extraction instruction and request construction.
//!
//! The instruction asks for Spanish JSON keys; [`AnnotationResult`]
//! deserializes exactly those keys.
//!
//! [`AnnotationResult`]: crate::models::AnnotationResult

use crate::models::{AnnotationRequest, RetrievedFile};

/// Instruction sent with every document.
pub const EXTRACTION_INSTRUCTION: &str = r#"Eres un asistente experto en documentos fiscales. Analiza el documento adjunto y extrae la siguiente información:

- "tipo_de_documento": el tipo de documento (por ejemplo "W-2", "1099-NEC", "1099-INT", "1098", "recibo", "factura").
- "año_fiscal": el año fiscal al que corresponde el documento, como número.
- "nombre_del_emisor": el nombre de la empresa o persona que emitió el documento.
- "cifras_clave": un objeto con las cifras más importantes del documento (salarios, retenciones, intereses, totales), donde cada valor es un número o un texto.
- "resumen": un resumen breve del documento en una o dos oraciones.

Responde ÚNICAMENTE con un objeto JSON válido que contenga exactamente esas claves. No incluyas texto adicional, explicaciones ni bloques de código."#;

/// Build the request for a downloaded document.
pub fn document_request(file: RetrievedFile) -> AnnotationRequest {
    AnnotationRequest {
        instruction_text: EXTRACTION_INSTRUCTION.to_string(),
        attachment: Some(file),
    }
}

/// Build a text-only request from a caller-supplied prompt.
pub fn text_request(prompt: &str) -> AnnotationRequest {
    AnnotationRequest {
        instruction_text: prompt.to_string(),
        attachment: None,
    }
}
