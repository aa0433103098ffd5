//! Tipos de Erro do Subsistema de Memória
//!
//! Define erros estruturados para diagnóstico de falhas de API do reclaim.
//! Falhas por página NUNCA viram erro: são variantes de `EvictOutcome`.

/// Erros do subsistema de memória
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmError {
    /// Sem frames livres na zona
    OutOfMemory,
    /// Parâmetro inválido (ex: swappiness > 100)
    InvalidParameter,
    /// Índice de zona/página fora dos limites
    OutOfBounds,
    /// Página já está em uma lista LRU
    AlreadyOnLru,
    /// Página não está em nenhuma lista LRU
    NotOnLru,
    /// Índice já ocupado no mapping
    AlreadyMapped,
    /// Handle de shrinker desconhecido
    UnknownShrinker,
    /// Write-back falhou por falta de espaço (ENOSPC)
    NoSpace,
    /// Write-back falhou com erro de I/O (EIO)
    IoError,
}

impl MmError {
    /// Retorna descrição legível do erro
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfMemory => "OOM: sem frames livres na zona",
            Self::InvalidParameter => "Parâmetro inválido",
            Self::OutOfBounds => "Índice fora dos limites",
            Self::AlreadyOnLru => "Página já está em uma LRU",
            Self::NotOnLru => "Página não está em nenhuma LRU",
            Self::AlreadyMapped => "Índice já ocupado no mapping",
            Self::UnknownShrinker => "Shrinker não registrado",
            Self::NoSpace => "ENOSPC: sem espaço no backing store",
            Self::IoError => "EIO: erro de I/O no write-back",
        }
    }
}

impl core::fmt::Display for MmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tipo Result específico para operações de memória
pub type MmResult<T> = Result<T, MmError>;

/// Código de erro devolvido por um write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritebackError {
    /// ENOSPC
    NoSpace,
    /// EIO e qualquer outro erro de transporte
    Io,
}

impl From<WritebackError> for MmError {
    fn from(err: WritebackError) -> Self {
        match err {
            WritebackError::NoSpace => MmError::NoSpace,
            WritebackError::Io => MmError::IoError,
        }
    }
}
