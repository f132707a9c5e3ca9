fn main() {
    // GUIシェルを含むビルドのみTauriのコンテキスト生成が必要
    #[cfg(feature = "gui")]
    tauri_build::build();
}
