pub enum Instruction {
    SaveCf { key: String, value: Vec<u8> },
    GetCf { key: String },
    RemoveCf { key: String },
}
