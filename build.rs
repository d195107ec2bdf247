fn main() {
    // Ruta de búsqueda para ONNX Runtime (misma distribución que el daemon)
    let ort_dir = "onnxruntime-linux-x64-1.22.0";
    if std::path::Path::new(ort_dir).exists() {
        println!("cargo:rustc-link-search=native={}/lib", ort_dir);
        println!("cargo:rustc-link-lib=dylib=onnxruntime");
    }

    // Recompilar si cambia el directorio de ONNX Runtime
    println!("cargo:rerun-if-changed={}/", ort_dir);
}
