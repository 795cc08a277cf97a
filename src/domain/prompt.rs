use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Sentinel the model writes into `reason` when a value could not be read.
pub const UNREADABLE_SENTINEL: &str = "ไม่สามารถอ่านค่าได้";

const DEFAULT_INSTRUCTIONS: &str = "วิเคราะห์รูปภาพตารางข้อมูลการอ่านค่ามิเตอร์ไฟฟ้าที่แนบมา และตรวจสอบความถูกต้องของค่าตามเงื่อนไขต่อไปนี้:
1.  **แถว 007, 008, 009:** นำค่ามาบวกกัน ผลรวมต้องเท่ากับค่าใน **แถว 006**
2.  **แถว 013:** นำค่าบนลบค่าล่าง ผลลัพธ์ต้องเท่ากับค่าใน **แถว 010**
3.  **แถว 014:** นำค่าบนลบค่าล่าง ผลลัพธ์ต้องเท่ากับค่าใน **แถว 011**
4.  **แถว 015:** นำค่าบนลบค่าล่าง ผลลัพธ์ต้องเท่ากับค่าใน **แถว 012**

โปรดอ่านค่าตัวเลขจากภาพอย่างละเอียดและแม่นยำ
สำหรับผลลัพธ์ ให้ตอบกลับในรูปแบบ JSON ที่สอดคล้องกับ schema ที่กำหนดเท่านั้น";

/// Instruction text plus the structured-output contract sent with every image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterPrompt {
    pub instructions: String,
    pub unreadable_sentinel: String,
}

impl Default for MeterPrompt {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            unreadable_sentinel: UNREADABLE_SENTINEL.to_string(),
        }
    }
}

impl MeterPrompt {
    /// Deployment-specific rules with the default sentinel.
    pub fn with_instructions(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            ..Self::default()
        }
    }

    pub fn render(&self) -> String {
        format!(
            "{}\nสำหรับฟิลด์ 'reason': หากการตรวจสอบไม่ผ่านเพราะผลการคำนวณไม่ตรงกับค่าที่คาดหวัง ให้ปล่อยฟิลด์นี้เป็นค่าว่าง (empty string) แต่หากไม่ผ่านเพราะไม่สามารถอ่านค่าตัวเลขได้ ให้ระบุว่า \"{}\"",
            self.instructions.trim_end(),
            self.unreadable_sentinel
        )
    }

    /// Array of objects shaped like `AnalysisResult`; `reason` is the only
    /// optional field.
    pub fn response_schema(&self) -> Value {
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "condition": {
                        "type": "STRING",
                        "description": "เงื่อนไขการตรวจสอบ เช่น \"007+008+009 = 006\""
                    },
                    "calculation": {
                        "type": "STRING",
                        "description": "สมการที่คำนวณจากค่าที่อ่านได้ ไม่รวมผลลัพธ์ เช่น \"402+396+559\""
                    },
                    "actualResult": {
                        "type": "STRING",
                        "description": "ผลลัพธ์ที่ได้จากการคำนวณ"
                    },
                    "expectedValue": {
                        "type": "STRING",
                        "description": "ค่าที่ควรจะเป็นตามที่อ่านได้จากตาราง"
                    },
                    "status": {
                        "type": "BOOLEAN",
                        "description": "สถานะ: true ถ้าผ่าน, false ถ้าไม่ผ่าน"
                    },
                    "reason": {
                        "type": "STRING",
                        "description": format!(
                            "หากไม่ผ่านเพราะผลการคำนวณไม่ตรงกับค่าที่คาดหวัง ให้ปล่อยเป็นค่าว่าง แต่หากไม่ผ่านเพราะไม่สามารถอ่านค่าได้ ให้ระบุว่า \"{}\"",
                            self.unreadable_sentinel
                        )
                    }
                },
                "required": ["condition", "calculation", "actualResult", "expectedValue", "status"]
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data_base64: String,
}

/// Everything the transport needs for one structured vision call.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionRequest {
    pub image: InlineImage,
    pub prompt: String,
    pub response_schema: Value,
}

impl VisionRequest {
    pub fn new(image: InlineImage, prompt: &MeterPrompt) -> Self {
        Self {
            image,
            prompt: prompt.render(),
            response_schema: prompt.response_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_required_fields() {
        let schema = MeterPrompt::default().response_schema();
        let required: Vec<&str> = schema["items"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(
            required,
            vec!["condition", "calculation", "actualResult", "expectedValue", "status"]
        );
        assert_eq!(schema["items"]["properties"]["status"]["type"], "BOOLEAN");
    }

    #[test]
    fn test_render_mentions_sentinel() {
        let prompt = MeterPrompt::with_instructions("Check rows 1 and 2.\n");
        let rendered = prompt.render();
        assert!(rendered.starts_with("Check rows 1 and 2.\n"));
        assert!(rendered.contains(UNREADABLE_SENTINEL));
    }

    #[test]
    fn test_default_prompt_lists_four_rules() {
        let rendered = MeterPrompt::default().render();
        for row in ["006", "010", "011", "012"] {
            assert!(rendered.contains(row), "missing row {}", row);
        }
    }
}
